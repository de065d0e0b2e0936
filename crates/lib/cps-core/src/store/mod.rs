//! Read-only store backends.
//!
//! The store layer opens the two externally-prepared artifacts (the
//! relational SQLite file and the vector index file) and runs bounded,
//! read-only queries against them.

pub mod relational;
pub mod vector;

use std::{error::Error, fmt, path::PathBuf, time::Duration};

pub use relational::SchoolDb;
pub use vector::WebsiteIndex;

#[derive(Debug)]
pub enum StoreError {
    /// The configured store file is missing or could not be opened.
    /// Fatal at startup, non-retriable.
    Unavailable { path: PathBuf, reason: String },
    /// The backend rejected the statement (bad syntax, unknown table or
    /// column, and the like).
    QuerySyntax(String),
    /// Execution exceeded the configured bound and was interrupted.
    Timeout(Duration),
    /// The query or scan failed mid-flight.
    QueryFailed(String),
    /// A stored embedding's width differs from the query embedding's.
    DimensionMismatch { expected: usize, actual: usize },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable { path, reason } => {
                write!(f, "store unavailable at {}: {reason}", path.display())
            }
            Self::QuerySyntax(message) => write!(f, "query syntax error: {message}"),
            Self::Timeout(bound) => {
                write!(f, "query exceeded the {}s execution bound", bound.as_secs())
            }
            Self::QueryFailed(message) => write!(f, "query failed: {message}"),
            Self::DimensionMismatch { expected, actual } => write!(
                f,
                "embedding dimension mismatch: query has {expected}, index has {actual}"
            ),
        }
    }
}

impl Error for StoreError {}

pub type StoreResult<T> = Result<T, StoreError>;
