use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use cps_core::control::{ControlError, NO_RESULTS_MARKER};
use cps_core::embed::{EmbedError, Embedder};
use cps_core::services::{DataServices, ServiceConfig};
use rusqlite::Connection;
use tempfile::TempDir;

/// Deterministic embedder: maps a handful of known phrases onto fixed unit
/// vectors so similarity ordering is predictable without a model download.
struct KeywordEmbedder {
    dimensions: usize,
}

impl Embedder for KeywordEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let mut vector = vec![0.0f32; self.dimensions];
        let lowered = text.to_ascii_lowercase();
        if lowered.contains("math") {
            vector[0] = 1.0;
        }
        if lowered.contains("sports") {
            vector[1] = 1.0;
        }
        if lowered.contains("music") {
            vector[2] = 1.0;
        }
        Ok(vector)
    }
}

fn embedding_blob(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn build_school_db(path: &Path) {
    let conn = Connection::open(path).expect("open school db");
    conn.execute_batch(cps_store::schema::SCHOOL_NEIGHBORHOOD_DDL)
        .expect("create schooltoneighborhood");
    let rows = [
        (1, "2024-09-01 08:00:00", 609_726, "TAFT HS", "Norwood Park"),
        (2, "2024-09-01 08:00:00", 609_746, "LANE TECH HS", "Roscoe Village"),
        (3, "2024-09-01 08:00:00", 610_245, "DARWIN", "Logan Square"),
        (4, "2024-09-01 08:00:00", 609_813, "GOETHE", "Logan Square"),
    ];
    for (id, created_at, school_id, school_name, neighborhood) in rows {
        conn.execute(
            "INSERT INTO schooltoneighborhood (id, created_at, school_id, school_name, neighborhood) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![id, created_at, school_id, school_name, neighborhood],
        )
        .expect("insert school row");
    }
}

fn build_index(path: &Path, dimensions: usize) {
    let conn = Connection::open(path).expect("open index db");
    conn.execute_batch(cps_store::schema::WEBPAGE_CHUNK_DDL)
        .expect("create webpagechunk");
    let mut math = vec![0.0f32; dimensions];
    math[0] = 1.0;
    let mut math_and_sports = vec![0.0f32; dimensions];
    math_and_sports[0] = 0.7;
    math_and_sports[1] = 0.7;
    let mut sports = vec![0.0f32; dimensions];
    sports[1] = 1.0;
    let chunks = [
        (1, "TAFT HS", "https://tafths.org/math", "Taft offers AP calculus and statistics.", math),
        (
            2,
            "TAFT HS",
            "https://tafths.org/athletics",
            "Taft fields soccer and swimming teams with mandatory math tutoring.",
            math_and_sports,
        ),
        (
            3,
            "LANE TECH HS",
            "https://lanetech.org/athletics",
            "Lane Tech athletics include football and track.",
            sports,
        ),
    ];
    for (id, school_name, page_url, text, embedding) in chunks {
        conn.execute(
            "INSERT INTO webpagechunk (id, school_name, page_url, text, embedding) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![id, school_name, page_url, text, embedding_blob(&embedding)],
        )
        .expect("insert chunk");
    }
}

struct Fixture {
    _dir: TempDir,
    services: DataServices,
}

fn fixture_with(dimensions: usize, embedder_dimensions: usize, top_k: usize) -> Fixture {
    let dir = tempfile::tempdir().expect("tempdir");
    let sqlite_path: PathBuf = dir.path().join("schools.db");
    let index_path: PathBuf = dir.path().join("websites.db");
    build_school_db(&sqlite_path);
    build_index(&index_path, dimensions);

    let services = DataServices::new(ServiceConfig {
        sqlite_path,
        index_path,
        embedding_model: "all-minilm-l6-v2".to_string(),
        top_k,
        max_rows: 100,
        max_context_chars: 4000,
        query_timeout: Duration::from_secs(5),
        search_timeout: Duration::from_secs(5),
    })
    .with_embedder(Arc::new(KeywordEmbedder {
        dimensions: embedder_dimensions,
    }));
    Fixture {
        _dir: dir,
        services,
    }
}

fn fixture() -> Fixture {
    fixture_with(8, 8, 2)
}

#[tokio::test]
async fn select_projection_matches_statement() {
    let fixture = fixture();
    let control = fixture.services.control().await.expect("control plane");
    let rows = control
        .query_schools("SELECT school_name, neighborhood FROM schooltoneighborhood ORDER BY id")
        .await
        .expect("select should succeed");

    assert_eq!(rows.len(), 4);
    let columns: Vec<&str> = rows[0].keys().map(String::as_str).collect();
    assert_eq!(columns, ["school_name", "neighborhood"]);
    assert_eq!(rows[0]["school_name"], "TAFT HS");
}

#[tokio::test]
async fn logan_square_roundtrip() {
    let fixture = fixture();
    let control = fixture.services.control().await.expect("control plane");
    let rows = control
        .query_schools("SELECT * FROM schooltoneighborhood WHERE neighborhood = 'Logan Square'")
        .await
        .expect("select should succeed");

    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|row| row["neighborhood"] == "Logan Square"));
}

#[tokio::test]
async fn identical_queries_return_identical_rows() {
    let fixture = fixture();
    let control = fixture.services.control().await.expect("control plane");
    let query = "SELECT id, school_name FROM schooltoneighborhood ORDER BY id";
    let first = control.query_schools(query).await.expect("first run");
    let second = control.query_schools(query).await.expect("second run");
    assert_eq!(first, second);
}

#[tokio::test]
async fn mutating_statements_are_rejected_without_execution() {
    let fixture = fixture();
    let control = fixture.services.control().await.expect("control plane");
    let err = control
        .query_schools("DELETE FROM schooltoneighborhood")
        .await
        .expect_err("delete must be rejected");
    assert!(matches!(err, ControlError::QueryRejected(_)));

    // Store untouched: every row is still there.
    let rows = control
        .query_schools("SELECT id FROM schooltoneighborhood")
        .await
        .expect("select after rejection");
    assert_eq!(rows.len(), 4);
}

#[tokio::test]
async fn unknown_column_is_a_syntax_error_not_a_crash() {
    let fixture = fixture();
    let control = fixture.services.control().await.expect("control plane");
    let err = control
        .query_schools("SELECT no_such_column FROM schooltoneighborhood")
        .await
        .expect_err("backend should reject");
    assert!(matches!(err, ControlError::QuerySyntax(_)));
}

#[tokio::test]
async fn retrieval_orders_passages_by_similarity() {
    let fixture = fixture();
    let control = fixture.services.control().await.expect("control plane");
    let context = control
        .retrieve_context("what math courses are offered?", None)
        .await
        .expect("retrieval should succeed");

    let calculus = context.find("AP calculus").expect("best hit present");
    let tutoring = context
        .find("mandatory math tutoring")
        .expect("second hit present");
    assert!(calculus < tutoring);
    // top_k = 2: the pure-sports chunk is never included.
    assert!(!context.contains("football and track"));
}

#[tokio::test]
async fn school_filter_restricts_retrieval() {
    let fixture = fixture();
    let control = fixture.services.control().await.expect("control plane");
    let context = control
        .retrieve_context("sports teams", Some("lane tech hs"))
        .await
        .expect("retrieval should succeed");

    assert!(context.contains("football and track"));
    assert!(!context.contains("Taft"));
}

#[tokio::test]
async fn no_matches_is_success_with_marker() {
    let fixture = fixture();
    let control = fixture.services.control().await.expect("control plane");
    let context = control
        .retrieve_context("music program", Some("NO SUCH SCHOOL"))
        .await
        .expect("empty match set is a success");
    assert_eq!(context, NO_RESULTS_MARKER);
}

#[tokio::test]
async fn dimension_mismatch_is_a_typed_failure() {
    let fixture = fixture_with(8, 6, 2);
    let control = fixture.services.control().await.expect("control plane");
    let err = control
        .retrieve_context("math", None)
        .await
        .expect_err("mismatched widths must fail");
    assert!(matches!(
        err,
        ControlError::EmbeddingDimensionMismatch {
            expected: 6,
            actual: 8
        }
    ));
}
