//! Error types for the wire crate.

use thiserror::Error;

/// Reasons a buffer is not a JSON frame.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("empty frame")]
    Empty,
    #[error("malformed JSON frame: {0}")]
    Json(#[from] serde_json::Error),
}
