//! The synchronization engine. Turns reported chain heights into ingested
//! transactions and recorded matches.
//!
//! # Per-block strategy
//!
//! For a reported head `h`, every block in `[cursor, h]` is visited in order:
//!
//! - **Light refresh** (`block == cursor`): the previously seen head may have
//!   gained transactions since it was last observed. Only the hash list is
//!   fetched; transactions missing from the store are fetched one by one.
//! - **Full fetch** (`block > cursor`): a block never seen before. All
//!   transaction objects are fetched in one call.
//!
//! # Failure policy
//!
//! A fetch failure aborts the current block. The cursor moves to the last
//! block that completed and the failed block is retried on the next pass.
//! Work done before the failure is kept.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

use crate::cursor::Cursor;
use crate::error::WatchError;
use crate::matcher::match_subscribers;
use crate::source::LedgerSource;
use crate::store::TransactionStore;
use crate::subscription::SubscriptionIndex;
use crate::types::Transaction;

/// How a block is fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPath {
    /// Hash list first, then only the missing transactions.
    LightRefresh,
    /// All transaction objects in a single call.
    FullFetch,
}

/// Counters published by the engine after every pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatus {
    /// Highest block height fully ingested.
    pub last_ingested_height: u64,
    /// Blocks completed (light refreshes included).
    pub blocks_ingested: u64,
    /// Transactions newly added to the store.
    pub transactions_ingested: u64,
    /// Transaction hashes newly recorded against a subscriber.
    pub matches_recorded: u64,
    /// Blocks aborted by a fetch failure.
    pub fetch_failures: u64,
}

/// Owns the ingestion cursor and drives ingestion.
///
/// `on_new_height` takes `&mut self`, so at most one pass can be in flight.
pub struct SyncEngine {
    source: Arc<dyn LedgerSource>,
    store: TransactionStore,
    index: SubscriptionIndex,
    cursor: Cursor,
    status: SyncStatus,
    status_tx: watch::Sender<SyncStatus>,
}

impl SyncEngine {
    /// Create an engine whose cursor starts at `start_height`.
    pub fn new(
        source: Arc<dyn LedgerSource>,
        store: TransactionStore,
        index: SubscriptionIndex,
        start_height: u64,
    ) -> Self {
        let status = SyncStatus {
            last_ingested_height: start_height,
            ..SyncStatus::default()
        };
        let (status_tx, _) = watch::channel(status);
        Self {
            source,
            store,
            index,
            cursor: Cursor::new(start_height),
            status,
            status_tx,
        }
    }

    /// Create an engine positioned at the source's current chain head.
    pub async fn bootstrap(
        source: Arc<dyn LedgerSource>,
        store: TransactionStore,
        index: SubscriptionIndex,
    ) -> Result<Self, WatchError> {
        let head = source.block_number().await?;
        tracing::info!(head, "Ingestion cursor initialized from chain head");
        Ok(Self::new(source, store, index, head))
    }

    /// Highest block height fully ingested.
    pub fn cursor(&self) -> u64 {
        self.cursor.block_number
    }

    pub fn status(&self) -> SyncStatus {
        self.status
    }

    /// Receiver that observes the status published after every pass.
    pub fn subscribe_status(&self) -> watch::Receiver<SyncStatus> {
        self.status_tx.subscribe()
    }

    /// Ingest everything in `[cursor, height]`.
    ///
    /// A height below the cursor is ignored. On a fetch failure the cursor
    /// stops at the last completed block and the error is returned.
    pub async fn on_new_height(&mut self, height: u64) -> Result<(), WatchError> {
        if self.cursor.is_behind(height) {
            tracing::debug!(
                height,
                cursor = self.cursor.block_number,
                "Reported height is behind the cursor, ignoring"
            );
            return Ok(());
        }

        let start = self.cursor.block_number;
        for block in start..=height {
            let path = if block == start {
                FetchPath::LightRefresh
            } else {
                FetchPath::FullFetch
            };

            match self.ingest_block(block, path).await {
                Ok(ingested) => {
                    self.status.blocks_ingested += 1;
                    tracing::debug!(block, ?path, ingested, "Block ingested");
                }
                Err(e) => {
                    self.status.fetch_failures += 1;
                    if block > start {
                        self.cursor.advance(block - 1);
                        tracing::warn!(
                            block,
                            ?path,
                            cursor = self.cursor.block_number,
                            error = %e,
                            "Block ingestion failed, will retry on next pass"
                        );
                    } else {
                        // Nothing past the cursor is ingested until this block refreshes.
                        tracing::warn!(
                            block,
                            fetch_failures = self.status.fetch_failures,
                            error = %e,
                            "Cursor block refresh failed, ingestion stalled"
                        );
                    }
                    self.publish();
                    return Err(e);
                }
            }
        }

        if self.cursor.advance(height) {
            tracing::info!(height, "Current block updated");
        }
        self.publish();
        Ok(())
    }

    /// Consume heights until the sender side is dropped.
    ///
    /// Each height is processed to completion before the next one is
    /// received. Errors are logged and never stop the loop.
    pub async fn run(mut self, mut heights: mpsc::Receiver<u64>) {
        tracing::info!(cursor = self.cursor.block_number, "Sync engine started");
        while let Some(height) = heights.recv().await {
            if let Err(e) = self.on_new_height(height).await {
                if !e.is_fetch_failure() {
                    tracing::error!(height, error = %e, "Ingestion pass failed");
                }
            }
        }
        tracing::info!(cursor = self.cursor.block_number, "Sync engine stopped");
    }

    async fn ingest_block(&mut self, block: u64, path: FetchPath) -> Result<usize, WatchError> {
        let mut ingested = 0;
        match path {
            FetchPath::LightRefresh => {
                let hashes = self.source.block_transaction_hashes(block).await?;
                for hash in hashes {
                    if self.store.exists(&hash).await {
                        continue;
                    }
                    let tx = self.source.transaction_by_hash(&hash).await?;
                    if self.ingest(tx).await {
                        ingested += 1;
                    }
                }
            }
            FetchPath::FullFetch => {
                for tx in self.source.block_transactions(block).await? {
                    if self.store.exists(&tx.hash).await {
                        continue;
                    }
                    if self.ingest(tx).await {
                        ingested += 1;
                    }
                }
            }
        }
        Ok(ingested)
    }

    /// Store `tx` and record it against every subscriber it touches.
    ///
    /// Returns `false` if the hash was already stored, in which case nothing
    /// is recorded.
    async fn ingest(&mut self, tx: Transaction) -> bool {
        let subscribers = self.index.addresses().await;
        let matched = match_subscribers(&tx, &subscribers);

        let hash = tx.hash.clone();
        if !self.store.upsert(tx).await {
            return false;
        }
        self.status.transactions_ingested += 1;

        // Matches are recorded only once the transaction is readable.
        for address in matched {
            match self.index.record_match(&address, &hash).await {
                Ok(true) => {
                    self.status.matches_recorded += 1;
                    tracing::debug!(%address, %hash, "Transaction matched");
                }
                Ok(false) => {}
                Err(e) => tracing::warn!(%address, %hash, error = %e, "Failed to record match"),
            }
        }
        true
    }

    fn publish(&mut self) {
        self.status.last_ingested_height = self.cursor.block_number;
        self.status_tx.send_replace(self.status);
    }
}
