use std::error::Error;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::OnceCell;
use tracing::info;

use crate::control::{CpsControlPlane, RetrievalConfig};
use crate::embed::{EmbedError, Embedder, FastembedEmbedder};
use crate::store::{SchoolDb, StoreError, WebsiteIndex};

/// Deployment configuration for the two store handles and retrieval.
///
/// `top_k`, `max_context_chars`, and `embedding_model` must match how the
/// vector index was built; they are supplied at process start, never
/// defaulted silently by this core.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub sqlite_path: PathBuf,
    pub index_path: PathBuf,
    pub embedding_model: String,
    pub top_k: usize,
    pub max_rows: usize,
    pub max_context_chars: usize,
    pub query_timeout: Duration,
    pub search_timeout: Duration,
}

#[derive(Debug)]
pub enum ServiceError {
    /// A backing store could not be opened. Fatal at startup.
    StoreUnavailable(StoreError),
    /// The configured embedding model is not usable.
    Embedding(EmbedError),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StoreUnavailable(err) => write!(f, "{err}"),
            Self::Embedding(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        Self::StoreUnavailable(err)
    }
}

impl From<EmbedError> for ServiceError {
    fn from(err: EmbedError) -> Self {
        Self::Embedding(err)
    }
}

/// Lazily-initialized, process-lifetime handles to the two stores.
///
/// The control plane is built exactly once; repeated `control` calls return
/// the same handles. Store connections are released when the process drops
/// the services on shutdown.
pub struct DataServices {
    config: ServiceConfig,
    embedder_override: Option<Arc<dyn Embedder>>,
    plane: OnceCell<Arc<CpsControlPlane>>,
}

impl DataServices {
    #[must_use]
    pub fn new(config: ServiceConfig) -> Self {
        Self {
            config,
            embedder_override: None,
            plane: OnceCell::new(),
        }
    }

    /// Swaps in a caller-provided embedder. Used by tests and by
    /// deployments embedding through something other than fastembed.
    #[must_use]
    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder_override = Some(embedder);
        self
    }

    #[must_use]
    pub const fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Returns the shared control plane, opening both stores on first use.
    ///
    /// # Errors
    /// Returns `ServiceError::StoreUnavailable` if either store file
    /// cannot be opened, `ServiceError::Embedding` for an unknown model.
    pub async fn control(&self) -> Result<Arc<CpsControlPlane>, ServiceError> {
        let plane = self
            .plane
            .get_or_try_init(|| async { self.build().map(Arc::new) })
            .await?;
        Ok(Arc::clone(plane))
    }

    /// Eagerly opens both stores so a missing artifact fails the process
    /// at startup instead of on the first tool call.
    ///
    /// # Errors
    /// Same as [`Self::control`].
    pub async fn init(&self) -> Result<(), ServiceError> {
        self.control().await.map(drop)
    }

    fn build(&self) -> Result<CpsControlPlane, ServiceError> {
        let schools = SchoolDb::open(
            &self.config.sqlite_path,
            self.config.max_rows,
            self.config.query_timeout,
        )?;
        let websites = WebsiteIndex::open(&self.config.index_path, self.config.search_timeout)?;
        let embedder: Arc<dyn Embedder> = match &self.embedder_override {
            Some(embedder) => Arc::clone(embedder),
            None => Arc::new(FastembedEmbedder::new(&self.config.embedding_model)?),
        };
        info!(
            sqlite = %self.config.sqlite_path.display(),
            index = %self.config.index_path.display(),
            top_k = self.config.top_k,
            "opened store handles"
        );
        Ok(CpsControlPlane::new(
            schools,
            websites,
            embedder,
            RetrievalConfig {
                top_k: self.config.top_k,
                max_context_chars: self.config.max_context_chars,
            },
        ))
    }
}
