//! In-memory transaction store.
//!
//! Holds every ingested transaction for the lifetime of the process, keyed
//! by hash. There is no deletion and no eviction.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::types::Transaction;

/// Thread-safe transaction store. Cloning shares the underlying map.
#[derive(Clone, Default)]
pub struct TransactionStore {
    inner: Arc<RwLock<HashMap<String, Transaction>>>,
}

impl TransactionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a transaction unless its hash is already present.
    ///
    /// Returns `true` if the transaction was newly inserted. An existing
    /// record is never replaced.
    pub async fn upsert(&self, tx: Transaction) -> bool {
        let mut txs = self.inner.write().await;
        if txs.contains_key(&tx.hash) {
            return false;
        }
        txs.insert(tx.hash.clone(), tx);
        true
    }

    /// Look up a transaction by hash.
    pub async fn get(&self, hash: &str) -> Option<Transaction> {
        self.inner.read().await.get(hash).cloned()
    }

    pub async fn exists(&self, hash: &str) -> bool {
        self.inner.read().await.contains_key(hash)
    }

    /// Number of stored transactions.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}
