//! Error types shared across the bridge crates.
//!
//! Everything internal is converted into one of the dialect error payloads at
//! the protocol boundary; no internal type name or backtrace ever reaches a
//! wire event.

use thiserror::Error;

/// Bridge error taxonomy.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Inbound request body was missing required fields or failed to decode.
    ///
    /// Raised before any backend call is made; callers should refuse the
    /// connection rather than open a stream.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The backend client could not be started (no configured model or the
    /// connection never came up).
    #[error("backend connection failed: {0}")]
    ConnectionFailed(String),

    /// The backend reported an error after streaming had begun.
    #[error("backend error: {0}")]
    BackendError(String),

    /// JSON (de)serialization failed.
    #[error("JSON error: {0}")]
    JsonError(String),

    /// Invariant violation inside the bridge itself.
    #[error("internal error: {0}")]
    InternalError(String),
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonError(err.to_string())
    }
}

impl BridgeError {
    /// True when the error happened before the first byte was streamed and
    /// should be surfaced as an immediate refusal instead of an in-band error
    /// event.
    pub fn is_pre_stream(&self) -> bool {
        matches!(self, Self::InvalidRequest(_) | Self::ConnectionFailed(_))
    }
}
