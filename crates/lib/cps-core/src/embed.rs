//! Question embedding.
//!
//! The embedding model is deployment configuration: it must be the same
//! model the vector index was built with, or nearest-neighbor scores are
//! meaningless and vector widths will not line up.

use std::{error::Error, fmt};
use std::sync::{Mutex, PoisonError};

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use tracing::info;

#[derive(Debug)]
pub enum EmbedError {
    /// The configured model name does not map to a supported model.
    UnknownModel(String),
    /// The embedding backend failed to load or to encode.
    Model(String),
}

impl fmt::Display for EmbedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownModel(name) => write!(f, "unknown embedding model: {name}"),
            Self::Model(message) => write!(f, "embedding failed: {message}"),
        }
    }
}

impl Error for EmbedError {}

/// Computes an embedding vector for a natural-language question.
///
/// Implementations are called from the blocking pool; `embed` may take as
/// long as a model load.
pub trait Embedder: Send + Sync {
    /// # Errors
    /// Returns `EmbedError` if the embedding cannot be computed.
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError>;
}

/// Local ONNX embedder backed by fastembed.
///
/// The model is loaded lazily on first use so startup stays fast and a
/// daemon that only ever serves SQL queries never pays for it.
pub struct FastembedEmbedder {
    model: EmbeddingModel,
    state: Mutex<Option<TextEmbedding>>,
}

impl FastembedEmbedder {
    /// # Errors
    /// Returns `EmbedError::UnknownModel` if `model_name` is not a
    /// supported model code.
    pub fn new(model_name: &str) -> Result<Self, EmbedError> {
        let model = parse_model(model_name)
            .ok_or_else(|| EmbedError::UnknownModel(model_name.to_string()))?;
        Ok(Self {
            model,
            state: Mutex::new(None),
        })
    }
}

impl Embedder for FastembedEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.is_none() {
            info!(model = ?self.model, "loading embedding model");
            let options =
                InitOptions::new(self.model.clone()).with_show_download_progress(false);
            let loaded =
                TextEmbedding::try_new(options).map_err(|err| EmbedError::Model(err.to_string()))?;
            *state = Some(loaded);
        }
        let Some(model) = state.as_ref() else {
            return Err(EmbedError::Model("embedding model unavailable".to_string()));
        };
        let mut embeddings = model
            .embed(vec![text], None)
            .map_err(|err| EmbedError::Model(err.to_string()))?;
        embeddings
            .pop()
            .ok_or_else(|| EmbedError::Model("model returned no embedding".to_string()))
    }
}

/// Maps a deployment-configured model code to a fastembed model.
#[must_use]
pub fn parse_model(name: &str) -> Option<EmbeddingModel> {
    match name.to_ascii_lowercase().as_str() {
        "all-minilm-l6-v2" => Some(EmbeddingModel::AllMiniLML6V2),
        "bge-small-en-v1.5" => Some(EmbeddingModel::BGESmallENV15),
        "nomic-embed-text-v1.5" => Some(EmbeddingModel::NomicEmbedTextV15),
        "multilingual-e5-small" => Some(EmbeddingModel::MultilingualE5Small),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::parse_model;

    #[test]
    fn known_model_codes_parse() {
        assert!(parse_model("nomic-embed-text-v1.5").is_some());
        assert!(parse_model("ALL-MiniLM-L6-V2").is_some());
    }

    #[test]
    fn unknown_model_code_is_rejected() {
        assert!(parse_model("word2vec-google-news").is_none());
    }
}
