use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One row of the `schooltoneighborhood` table.
///
/// Maintained by the external data-preparation project; this core only ever
/// reads it. `school_name` is all-caps by convention, `neighborhood` is not.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchoolNeighborhoodRow {
    pub id: i64,
    pub created_at: NaiveDateTime,
    pub school_id: i64,
    pub school_name: String,
    pub neighborhood: String,
}

/// One record of the `webpagechunk` vector index: a chunk of school-website
/// text with its embedding and source metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WebPageChunk {
    pub id: i64,
    pub school_name: String,
    pub page_url: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedding: Vec<f32>,
}

/// A scored retrieval hit produced by a nearest-neighbor search.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievedPassage {
    pub school_name: String,
    pub page_url: String,
    pub text: String,
    pub score: f32,
}

/// A result row of an arbitrary `SELECT`, mapping column name to value in
/// the statement's projected order of columns and backend-native row order.
pub type SqlRow = Map<String, Value>;
