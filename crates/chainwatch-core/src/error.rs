//! Error types for the chainwatch pipeline.

use thiserror::Error;

/// Errors that can occur while ingesting blocks or querying the index.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("block {block} not found")]
    BlockNotFound { block: u64 },

    #[error("transaction {hash} not found")]
    TransactionNotFound { hash: String },

    #[error("unknown subscriber: {address}")]
    UnknownSubscriber { address: String },

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("{0}")]
    Other(String),
}

impl WatchError {
    /// Returns `true` if the error came from the ledger data source.
    ///
    /// Fetch failures are never fatal: the affected block is retried on the
    /// next ingestion pass.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(
            self,
            Self::Fetch(_) | Self::BlockNotFound { .. } | Self::TransactionNotFound { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_failures_classified() {
        assert!(WatchError::Fetch("connection refused".into()).is_fetch_failure());
        assert!(WatchError::BlockNotFound { block: 7 }.is_fetch_failure());
        assert!(WatchError::TransactionNotFound { hash: "0x1".into() }.is_fetch_failure());
        assert!(!WatchError::UnknownSubscriber { address: "0xaa".into() }.is_fetch_failure());
        assert!(!WatchError::InvalidAddress(String::new()).is_fetch_failure());
    }
}
