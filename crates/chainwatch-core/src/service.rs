//! Service wiring. Builds the engine and spawns the background tasks.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::WatchConfig;
use crate::engine::SyncEngine;
use crate::error::WatchError;
use crate::facade::QueryFacade;
use crate::monitor::ChainHeadMonitor;
use crate::source::LedgerSource;
use crate::store::TransactionStore;
use crate::subscription::SubscriptionIndex;

/// A running ChainWatch instance.
///
/// Dropping the handle leaves the background tasks running; call
/// [`shutdown`](Self::shutdown) to stop them.
pub struct ChainWatch {
    facade: QueryFacade,
    monitor: JoinHandle<()>,
    engine: JoinHandle<()>,
}

impl ChainWatch {
    /// Fetch the initial chain head, then start the monitor and the engine.
    ///
    /// Fails if the initial height cannot be fetched.
    pub async fn start(
        source: Arc<dyn LedgerSource>,
        config: &WatchConfig,
    ) -> Result<Self, WatchError> {
        let store = TransactionStore::new();
        let index = SubscriptionIndex::new();

        let engine = SyncEngine::bootstrap(source.clone(), store.clone(), index.clone()).await?;
        let facade = QueryFacade::new(
            source.clone(),
            store,
            index,
            engine.subscribe_status(),
        );

        let (heights_tx, heights_rx) = mpsc::channel(1);
        let monitor = ChainHeadMonitor::new(source, config.poll_interval());

        let engine = tokio::spawn(engine.run(heights_rx));
        let monitor = tokio::spawn(monitor.run(heights_tx));

        Ok(Self {
            facade,
            monitor,
            engine,
        })
    }

    /// A query handle onto the running instance.
    pub fn facade(&self) -> QueryFacade {
        self.facade.clone()
    }

    /// Stop polling and wait for the engine to finish its current pass.
    pub async fn shutdown(self) {
        self.monitor.abort();
        if let Err(e) = self.monitor.await {
            if !e.is_cancelled() {
                tracing::error!(error = %e, "Chain head monitor task failed");
            }
        }
        if let Err(e) = self.engine.await {
            tracing::error!(error = %e, "Sync engine task failed");
        }
        tracing::info!("ChainWatch stopped");
    }
}
