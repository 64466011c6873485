//! Domain errors for the parley judging pipeline.

use thiserror::Error;
use uuid::Uuid;

/// Maximum number of characters of a judge payload carried inside an error.
pub const EXCERPT_MAX_CHARS: usize = 200;

/// Truncate a raw judge payload to a short excerpt on a char boundary.
pub fn excerpt(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.char_indices().nth(EXCERPT_MAX_CHARS) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

/// Domain-level errors that can occur while judging, correcting or intervening.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Judge call failed: {0}")]
    JudgeFailed(String),

    #[error("Judge call timed out after {timeout_ms}ms")]
    JudgeTimeout { timeout_ms: u64 },

    #[error("Failed to parse judge response ({reason}): {excerpt}")]
    ResponseParse { reason: String, excerpt: String },

    #[error("Batch response length mismatch: expected {expected} entries, got {actual}")]
    BatchLengthMismatch { expected: usize, actual: usize },

    #[error("Judge check response has no boolean `result`: {excerpt}")]
    InvalidCheckResult { excerpt: String },

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Evaluation run not found: {0}")]
    RunNotFound(Uuid),
}

impl DomainError {
    /// Build a parse error carrying a truncated excerpt of the offending payload.
    pub fn response_parse(reason: impl Into<String>, raw: &str) -> Self {
        Self::ResponseParse {
            reason: reason.into(),
            excerpt: excerpt(raw),
        }
    }

    /// Whether this error came from the judge's output rather than transport or storage.
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            Self::ResponseParse { .. } | Self::BatchLengthMismatch { .. } | Self::InvalidCheckResult { .. }
        )
    }
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}
