//! Query facade: the read/subscribe surface used by the HTTP layer.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;

use crate::engine::SyncStatus;
use crate::source::LedgerSource;
use crate::store::TransactionStore;
use crate::subscription::SubscriptionIndex;
use crate::types::{Address, Transaction};

/// Snapshot returned by [`QueryFacade::status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchStatus {
    #[serde(flatten)]
    pub sync: SyncStatus,
    /// Transactions currently held in the store.
    pub transactions_stored: usize,
    /// Registered subscribers.
    pub subscribers: usize,
}

/// Cheap to clone; all clones share the same store and index.
#[derive(Clone)]
pub struct QueryFacade {
    source: Arc<dyn LedgerSource>,
    store: TransactionStore,
    index: SubscriptionIndex,
    status: watch::Receiver<SyncStatus>,
}

impl QueryFacade {
    pub fn new(
        source: Arc<dyn LedgerSource>,
        store: TransactionStore,
        index: SubscriptionIndex,
        status: watch::Receiver<SyncStatus>,
    ) -> Self {
        Self {
            source,
            store,
            index,
            status,
        }
    }

    /// Live chain-head height from the source.
    ///
    /// Returns 0 if the source call fails; the failure is logged.
    pub async fn current_height(&self) -> u64 {
        match self.source.block_number().await {
            Ok(height) => height,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch current block");
                0
            }
        }
    }

    /// Register `address`. Idempotent; always reports success.
    pub async fn subscribe(&self, address: Address) -> bool {
        if self.index.subscribe(address.clone()).await {
            tracing::info!(%address, "Address subscribed");
        } else {
            tracing::debug!(%address, "Address already subscribed");
        }
        true
    }

    /// Transactions matched for `address`, ordered by block then position.
    ///
    /// `None` if the address is not subscribed. Hashes without a stored
    /// transaction are skipped.
    pub async fn transactions_for(&self, address: &Address) -> Option<Vec<Transaction>> {
        let hashes = self.index.matches_for(address).await.ok()?;

        let mut txs = Vec::with_capacity(hashes.len());
        for hash in hashes {
            match self.store.get(&hash).await {
                Some(tx) => txs.push(tx),
                None => tracing::error!(%address, %hash, "Matched transaction missing from store"),
            }
        }
        txs.sort_by(|a, b| {
            (a.block_number, a.transaction_index).cmp(&(b.block_number, b.transaction_index))
        });
        Some(txs)
    }

    /// Latest engine counters plus store and index sizes.
    pub async fn status(&self) -> WatchStatus {
        let sync = *self.status.borrow();
        WatchStatus {
            sync,
            transactions_stored: self.store.len().await,
            subscribers: self.index.len().await,
        }
    }
}
