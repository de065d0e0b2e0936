use std::{error::Error, fmt, sync::Arc};

use crate::embed::{EmbedError, Embedder};
use crate::store::{SchoolDb, StoreError, WebsiteIndex};

pub mod query;
pub mod retrieve;

pub use retrieve::NO_RESULTS_MARKER;

#[derive(Debug)]
pub enum ControlError {
    /// Input failed the read-only guard; the store was never touched.
    QueryRejected(String),
    /// The backend rejected the statement.
    QuerySyntax(String),
    /// SQL execution exceeded the configured bound.
    QueryTimeout(String),
    /// The embedding could not be computed.
    EmbeddingFailure(String),
    /// Query embedding width differs from the index's vector width.
    EmbeddingDimensionMismatch { expected: usize, actual: usize },
    /// The vector index could not be queried.
    IndexQueryFailure(String),
}

impl fmt::Display for ControlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QueryRejected(reason) => write!(f, "query rejected: {reason}"),
            Self::QuerySyntax(message) => write!(f, "query syntax error: {message}"),
            Self::QueryTimeout(message) => write!(f, "query timed out: {message}"),
            Self::EmbeddingFailure(message) => write!(f, "{message}"),
            Self::EmbeddingDimensionMismatch { expected, actual } => write!(
                f,
                "embedding dimension mismatch: question embedding has {expected} \
                 dimensions but the index was built with {actual}"
            ),
            Self::IndexQueryFailure(message) => write!(f, "index query failed: {message}"),
        }
    }
}

impl Error for ControlError {}

impl From<EmbedError> for ControlError {
    fn from(err: EmbedError) -> Self {
        Self::EmbeddingFailure(err.to_string())
    }
}

/// Retrieval parameters fixed per deployment; they mirror how the vector
/// index was built and are never invented here.
#[derive(Debug, Clone, Copy)]
pub struct RetrievalConfig {
    pub top_k: usize,
    pub max_context_chars: usize,
}

/// Read-only control plane over the two backing stores.
///
/// One instance per process; handlers share it by reference for the
/// process lifetime.
pub struct CpsControlPlane {
    schools: SchoolDb,
    websites: WebsiteIndex,
    embedder: Arc<dyn Embedder>,
    retrieval: RetrievalConfig,
}

impl CpsControlPlane {
    #[must_use]
    pub fn new(
        schools: SchoolDb,
        websites: WebsiteIndex,
        embedder: Arc<dyn Embedder>,
        retrieval: RetrievalConfig,
    ) -> Self {
        Self {
            schools,
            websites,
            embedder,
            retrieval,
        }
    }

    #[must_use]
    pub fn schools(&self) -> &SchoolDb {
        &self.schools
    }

    #[must_use]
    pub fn websites(&self) -> &WebsiteIndex {
        &self.websites
    }

    #[must_use]
    pub const fn retrieval(&self) -> &RetrievalConfig {
        &self.retrieval
    }

    pub(crate) fn embedder(&self) -> Arc<dyn Embedder> {
        Arc::clone(&self.embedder)
    }

    pub(crate) fn map_sql_store_err(err: StoreError) -> ControlError {
        match err {
            StoreError::Timeout(_) => ControlError::QueryTimeout(err.to_string()),
            StoreError::QuerySyntax(message) => ControlError::QuerySyntax(message),
            other => ControlError::QuerySyntax(other.to_string()),
        }
    }

    pub(crate) fn map_index_store_err(err: StoreError) -> ControlError {
        match err {
            StoreError::DimensionMismatch { expected, actual } => {
                ControlError::EmbeddingDimensionMismatch { expected, actual }
            }
            other => ControlError::IndexQueryFailure(other.to_string()),
        }
    }
}
