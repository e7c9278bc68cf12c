//! The ledger data source contract.
//!
//! The engine never talks to a node directly; it goes through this trait.
//! `chainwatch-rpc` provides the JSON-RPC implementation, tests provide
//! scripted ones.

use async_trait::async_trait;

use crate::error::WatchError;
use crate::types::Transaction;

/// Read access to a ledger.
///
/// Every error returned here is treated as a fetch failure by the engine.
#[async_trait]
pub trait LedgerSource: Send + Sync {
    /// Current chain-head height.
    async fn block_number(&self) -> Result<u64, WatchError>;

    /// Hashes of the transactions in block `number`.
    async fn block_transaction_hashes(&self, number: u64) -> Result<Vec<String>, WatchError>;

    /// Full transaction objects of block `number`.
    async fn block_transactions(&self, number: u64) -> Result<Vec<Transaction>, WatchError>;

    /// A single transaction by hash. Fails with
    /// [`WatchError::TransactionNotFound`] if the node does not know it.
    async fn transaction_by_hash(&self, hash: &str) -> Result<Transaction, WatchError>;
}
