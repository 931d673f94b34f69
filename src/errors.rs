use thiserror::Error;

use crate::value::ValueKind;

/// Failures raised for malformed input. Absence and type mismatch are never errors.
#[derive(Debug, Error)]
pub enum ContextError {
    // Input text could not be parsed as JSON
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    // The input was well-formed but is not a string-keyed mapping
    #[error("expected a mapping, found {found}")]
    NotAMapping { found: ValueKind },
}

// Result alias used across the crate
pub type Result<T> = std::result::Result<T, ContextError>;
