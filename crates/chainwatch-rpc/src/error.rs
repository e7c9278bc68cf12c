//! Transport-level error types.

use chainwatch_core::WatchError;
use thiserror::Error;

use crate::request::JsonRpcError;

/// Errors raised while talking to a JSON-RPC node.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection refused, non-2xx status, unreadable body.
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("request timed out after {ms}ms")]
    Timeout { ms: u64 },

    /// The node answered with a JSON-RPC error object.
    #[error("RPC error {}: {}", .0.code, .0.message)]
    Rpc(JsonRpcError),

    #[error("deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// The node answered, but the payload does not make sense.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl TransportError {
    /// Transient failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Timeout { .. })
    }
}

impl From<TransportError> for WatchError {
    fn from(e: TransportError) -> Self {
        WatchError::Fetch(e.to_string())
    }
}
