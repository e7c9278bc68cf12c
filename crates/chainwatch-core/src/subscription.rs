//! Subscription index: registered addresses and their matched transactions.
//!
//! Thread-safe via `Arc<RwLock<HashMap>>`. Each mutation touches a single
//! subscriber and is atomic on its own.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::WatchError;
use crate::types::Address;

/// Address → set of matched transaction hashes.
///
/// Match sets only grow; a subscriber is never removed.
#[derive(Clone, Default)]
pub struct SubscriptionIndex {
    inner: Arc<RwLock<HashMap<Address, HashSet<String>>>>,
}

impl SubscriptionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an address.
    ///
    /// Returns `true` if it was newly registered. Re-subscribing an existing
    /// address keeps its registration and everything matched so far.
    pub async fn subscribe(&self, address: Address) -> bool {
        let mut subs = self.inner.write().await;
        if subs.contains_key(&address) {
            return false;
        }
        subs.insert(address, HashSet::new());
        true
    }

    pub async fn exists(&self, address: &Address) -> bool {
        self.inner.read().await.contains_key(address)
    }

    /// Record `tx_hash` against a subscriber.
    ///
    /// Fails with [`WatchError::UnknownSubscriber`] if the address was never
    /// subscribed. Returns `true` if the hash was not already recorded.
    pub async fn record_match(&self, address: &Address, tx_hash: &str) -> Result<bool, WatchError> {
        let mut subs = self.inner.write().await;
        let matched = subs
            .get_mut(address)
            .ok_or_else(|| WatchError::UnknownSubscriber {
                address: address.to_string(),
            })?;
        Ok(matched.insert(tx_hash.to_string()))
    }

    /// Snapshot of all registered addresses.
    ///
    /// Subscriptions that complete after the snapshot is taken are not
    /// included; they are picked up by the next snapshot.
    pub async fn addresses(&self) -> HashSet<Address> {
        self.inner.read().await.keys().cloned().collect()
    }

    /// The transaction hashes matched for `address` so far.
    pub async fn matches_for(&self, address: &Address) -> Result<HashSet<String>, WatchError> {
        self.inner
            .read()
            .await
            .get(address)
            .cloned()
            .ok_or_else(|| WatchError::UnknownSubscriber {
                address: address.to_string(),
            })
    }

    /// Number of registered subscribers.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}
