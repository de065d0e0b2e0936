pub const TABLE_SCHOOL_NEIGHBORHOOD: &str = "schooltoneighborhood";
pub const TABLE_WEBPAGE_CHUNK: &str = "webpagechunk";

pub const COL_ID: &str = "id";
pub const COL_CREATED_AT: &str = "created_at";
pub const COL_SCHOOL_ID: &str = "school_id";
pub const COL_SCHOOL_NAME: &str = "school_name";
pub const COL_NEIGHBORHOOD: &str = "neighborhood";

pub const COL_PAGE_URL: &str = "page_url";
pub const COL_TEXT: &str = "text";
pub const COL_EMBEDDING: &str = "embedding";

/// DDL for `schooltoneighborhood` as maintained by the external data
/// preparation project. This core never executes it; it documents the
/// contract and backs test fixtures.
pub const SCHOOL_NEIGHBORHOOD_DDL: &str = "CREATE TABLE schooltoneighborhood (
    id INTEGER NOT NULL,
    created_at DATETIME NOT NULL,
    school_id INTEGER NOT NULL,
    school_name VARCHAR NOT NULL,
    neighborhood VARCHAR NOT NULL,
    PRIMARY KEY (id)
)";

/// DDL for `webpagechunk` inside the vector index file. Embeddings are
/// stored as little-endian f32 blobs whose width matches the embedding
/// model chosen at index-build time.
pub const WEBPAGE_CHUNK_DDL: &str = "CREATE TABLE webpagechunk (
    id INTEGER NOT NULL,
    school_name VARCHAR NOT NULL,
    page_url VARCHAR NOT NULL,
    text TEXT NOT NULL,
    embedding BLOB NOT NULL,
    PRIMARY KEY (id)
)";
