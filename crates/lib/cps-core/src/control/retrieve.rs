use cps_store::RetrievedPassage;
use tracing::debug;

use super::{ControlError, CpsControlPlane};

/// Returned in place of a context string when the index yields no matches.
/// Zero matches is a success, not a failure.
pub const NO_RESULTS_MARKER: &str = "No matching school website content was found.";

const PASSAGE_SEPARATOR: &str = "\n\n---\n\n";

impl CpsControlPlane {
    /// Embeds `question`, retrieves the top-k nearest website chunks, and
    /// assembles them into one bounded context string in descending
    /// similarity order. An optional school name restricts retrieval to
    /// that school's website.
    ///
    /// Retrieval only: the caller's own reasoning step consumes the
    /// context.
    ///
    /// # Errors
    /// Returns `ControlError::EmbeddingFailure`,
    /// `ControlError::EmbeddingDimensionMismatch`, or
    /// `ControlError::IndexQueryFailure`.
    pub async fn retrieve_context(
        &self,
        question: &str,
        school_name: Option<&str>,
    ) -> Result<String, ControlError> {
        let embedder = self.embedder();
        let text = question.to_owned();
        let embedding = tokio::task::spawn_blocking(move || embedder.embed(&text))
            .await
            .map_err(|err| ControlError::EmbeddingFailure(err.to_string()))?;
        let embedding = embedding?;

        let school = school_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_owned);
        let passages = self
            .websites()
            .search(embedding, school, self.retrieval().top_k)
            .await
            .map_err(Self::map_index_store_err)?;
        debug!(passages = passages.len(), "assembling retrieval context");
        Ok(assemble_context(&passages, self.retrieval().max_context_chars))
    }
}

/// Concatenates passages in the given (descending-similarity) order with
/// lightweight separators, capped at `max_chars`. Lowest-ranked passages
/// are dropped first; if the top passage alone exceeds the cap it is
/// truncated at a character boundary.
#[must_use]
pub fn assemble_context(passages: &[RetrievedPassage], max_chars: usize) -> String {
    if passages.is_empty() {
        return NO_RESULTS_MARKER.to_string();
    }

    let mut context = String::new();
    for passage in passages {
        let block = format!(
            "[{} | {}]\n{}",
            passage.school_name, passage.page_url, passage.text
        );
        if context.is_empty() {
            context.push_str(truncate_to(&block, max_chars));
        } else {
            if context.len() + PASSAGE_SEPARATOR.len() + block.len() > max_chars {
                break;
            }
            context.push_str(PASSAGE_SEPARATOR);
            context.push_str(&block);
        }
    }
    context
}

fn truncate_to(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
