use cps_store::SqlRow;
use tracing::debug;

use super::{ControlError, CpsControlPlane};

/// Keywords that mark a statement as something other than a plain read.
/// Matched at word boundaries, case-insensitively.
const FORBIDDEN_KEYWORDS: &[&str] = &[
    "INSERT", "UPDATE", "DELETE", "DROP", "ALTER", "CREATE", "ATTACH", "DETACH", "PRAGMA",
    "VACUUM", "REINDEX", "ANALYZE", "REPLACE", "BEGIN", "COMMIT", "ROLLBACK", "SAVEPOINT",
    "RELEASE",
];

impl CpsControlPlane {
    /// Validates and executes a single read-only `SELECT` against the
    /// school/neighborhood table, returning rows in backend-native order.
    ///
    /// # Errors
    /// Returns `ControlError::QueryRejected` if the guard refuses the
    /// statement (the store is never touched), `ControlError::QuerySyntax`
    /// if the backend rejects it, and `ControlError::QueryTimeout` if
    /// execution exceeds the configured bound.
    pub async fn query_schools(&self, query: &str) -> Result<Vec<SqlRow>, ControlError> {
        let statement = guard_select(query).map_err(ControlError::QueryRejected)?;
        debug!(statement, "executing guarded select");
        self.schools()
            .execute_select(statement)
            .await
            .map_err(Self::map_sql_store_err)
    }
}

/// Best-effort allowlist filter for caller-supplied SQL.
///
/// This is a syntactic pre-check, not a parser: it admits only input that
/// looks like exactly one `SELECT`, and it is deliberately conservative —
/// ambiguous input is rejected. It is a defense boundary; the read-only
/// connection and SQLite's own statement classification back it up.
///
/// # Errors
/// Returns the human-readable rejection reason.
pub fn guard_select(query: &str) -> Result<&str, String> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err("query must not be empty".to_string());
    }

    // A single trailing separator is tolerated; anything before further
    // input could chain a second statement.
    let statement = trimmed.strip_suffix(';').unwrap_or(trimmed).trim_end();
    if statement.is_empty() {
        return Err("query must not be empty".to_string());
    }
    if statement.contains(';') {
        return Err("multiple statements are not allowed".to_string());
    }
    if statement.contains("--") || statement.contains("/*") {
        return Err("SQL comments are not allowed".to_string());
    }

    let mut words = sql_words(statement);
    match words.next() {
        Some(first) if first.eq_ignore_ascii_case("SELECT") => {}
        _ => return Err("only SELECT statements are allowed".to_string()),
    }
    for word in sql_words(statement) {
        if let Some(keyword) = FORBIDDEN_KEYWORDS
            .iter()
            .find(|keyword| word.eq_ignore_ascii_case(keyword))
        {
            return Err(format!("keyword {keyword} is not allowed"));
        }
    }

    Ok(statement)
}

/// Splits a statement into identifier-like words (ASCII alphanumerics and
/// underscores), which is all the keyword check needs.
fn sql_words(statement: &str) -> impl Iterator<Item = &str> {
    statement
        .split(|ch: char| !(ch.is_ascii_alphanumeric() || ch == '_'))
        .filter(|word| !word.is_empty())
}
