use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use cps_store::RetrievedPassage;
use cps_store::schema::TABLE_WEBPAGE_CHUNK;
use rusqlite::{Connection, InterruptHandle, OpenFlags};
use tracing::debug;

use super::{StoreError, StoreResult};

/// Read-only handle to the file-backed vector index of school-website
/// chunks.
///
/// The index is built externally; its query interface is "given an
/// embedding, return the top-k nearest records". Similarity is cosine, the
/// metric the index was built with. Candidate rows are scanned on the
/// blocking pool under a configured timeout, with the same
/// interrupt-on-timeout discipline as the relational store.
pub struct WebsiteIndex {
    conn: Arc<Mutex<Connection>>,
    interrupt: InterruptHandle,
    path: PathBuf,
    timeout: Duration,
}

impl WebsiteIndex {
    /// Opens the vector index read-only.
    ///
    /// # Errors
    /// Returns `StoreError::Unavailable` if the file is missing or cannot
    /// be opened.
    pub fn open(path: &Path, timeout: Duration) -> StoreResult<Self> {
        if !path.is_file() {
            return Err(StoreError::Unavailable {
                path: path.to_path_buf(),
                reason: "file does not exist".to_string(),
            });
        }
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(path, flags).map_err(|err| {
            StoreError::Unavailable {
                path: path.to_path_buf(),
                reason: err.to_string(),
            }
        })?;
        let interrupt = conn.get_interrupt_handle();
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            interrupt,
            path: path.to_path_buf(),
            timeout,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the top-k records nearest to `embedding`, in non-increasing
    /// similarity order. An optional school name restricts candidates to
    /// one school's website, compared case-insensitively. Zero matches is
    /// an empty vec, not an error.
    ///
    /// # Errors
    /// Returns `StoreError::DimensionMismatch` if a stored vector's width
    /// differs from the query embedding's, `StoreError::Timeout` if the
    /// scan exceeds the bound, and `StoreError::QueryFailed` otherwise.
    pub async fn search(
        &self,
        embedding: Vec<f32>,
        school_name: Option<String>,
        top_k: usize,
    ) -> StoreResult<Vec<RetrievedPassage>> {
        let conn = Arc::clone(&self.conn);
        let mut task =
            tokio::task::spawn_blocking(move || run_search(&conn, &embedding, school_name, top_k));

        match tokio::time::timeout(self.timeout, &mut task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(StoreError::QueryFailed(join_err.to_string())),
            Err(_) => {
                self.interrupt.interrupt();
                let _ = task.await;
                Err(StoreError::Timeout(self.timeout))
            }
        }
    }
}

fn run_search(
    conn: &Mutex<Connection>,
    embedding: &[f32],
    school_name: Option<String>,
    top_k: usize,
) -> StoreResult<Vec<RetrievedPassage>> {
    let conn = conn.lock().unwrap_or_else(PoisonError::into_inner);
    let sql = if school_name.is_some() {
        format!(
            "SELECT school_name, page_url, text, embedding FROM {TABLE_WEBPAGE_CHUNK} \
             WHERE school_name = ?1 COLLATE NOCASE"
        )
    } else {
        format!("SELECT school_name, page_url, text, embedding FROM {TABLE_WEBPAGE_CHUNK}")
    };
    let mut stmt = conn
        .prepare(&sql)
        .map_err(|err| StoreError::QueryFailed(err.to_string()))?;
    let mut rows = match &school_name {
        Some(name) => stmt.query(rusqlite::params![name]),
        None => stmt.query([]),
    }
    .map_err(|err| StoreError::QueryFailed(err.to_string()))?;

    let mut scored: Vec<RetrievedPassage> = Vec::new();
    while let Some(row) = rows
        .next()
        .map_err(|err| StoreError::QueryFailed(err.to_string()))?
    {
        let school: String = row
            .get(0)
            .map_err(|err| StoreError::QueryFailed(err.to_string()))?;
        let page_url: String = row
            .get(1)
            .map_err(|err| StoreError::QueryFailed(err.to_string()))?;
        let text: String = row
            .get(2)
            .map_err(|err| StoreError::QueryFailed(err.to_string()))?;
        let blob: Vec<u8> = row
            .get(3)
            .map_err(|err| StoreError::QueryFailed(err.to_string()))?;

        let stored = decode_embedding(&blob).ok_or_else(|| {
            StoreError::QueryFailed("corrupt embedding blob in index".to_string())
        })?;
        if stored.len() != embedding.len() {
            return Err(StoreError::DimensionMismatch {
                expected: embedding.len(),
                actual: stored.len(),
            });
        }
        let score = cosine_similarity(embedding, &stored);
        scored.push(RetrievedPassage {
            school_name: school,
            page_url,
            text,
            score,
        });
    }

    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    scored.truncate(top_k);
    debug!(hits = scored.len(), "index search returned");
    Ok(scored)
}

fn decode_embedding(blob: &[u8]) -> Option<Vec<f32>> {
    if blob.is_empty() || blob.len() % 4 != 0 {
        return None;
    }
    let mut out = Vec::with_capacity(blob.len() / 4);
    for chunk in blob.chunks_exact(4) {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(chunk);
        out.push(f32::from_le_bytes(bytes));
    }
    Some(out)
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 { 0.0 } else { dot / denom }
}

#[cfg(test)]
mod tests {
    use super::{cosine_similarity, decode_embedding};

    #[test]
    fn cosine_of_identical_vectors_is_one() {
        let v = [0.5f32, 0.25, -1.0];
        let score = cosine_similarity(&v, &v);
        assert!((score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_of_orthogonal_vectors_is_zero() {
        let score = cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]);
        assert!(score.abs() < 1e-6);
    }

    #[test]
    fn zero_vector_scores_zero_instead_of_nan() {
        let score = cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]);
        assert!((score - 0.0).abs() < 1e-6);
    }

    #[test]
    fn decode_rejects_misaligned_blobs() {
        assert!(decode_embedding(&[0, 0, 0]).is_none());
        assert!(decode_embedding(&[]).is_none());
    }

    #[test]
    fn decode_roundtrips_le_f32() {
        let blob: Vec<u8> = [1.0f32, -2.5]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        let decoded = decode_embedding(&blob).expect("aligned blob should decode");
        assert_eq!(decoded, vec![1.0, -2.5]);
    }
}
