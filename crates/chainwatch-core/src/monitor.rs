//! Chain head monitor. Polls the ledger height on a fixed interval.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::source::LedgerSource;

/// Periodically fetches the chain-head height and hands it to the engine.
///
/// The first height is reported one full interval after [`run`](Self::run)
/// starts. A failed fetch is logged and the tick is skipped. Sending waits
/// for the consumer, so a slow engine back-pressures the monitor instead of
/// queueing heights.
pub struct ChainHeadMonitor {
    source: Arc<dyn LedgerSource>,
    interval: Duration,
}

impl ChainHeadMonitor {
    pub fn new(source: Arc<dyn LedgerSource>, interval: Duration) -> Self {
        Self { source, interval }
    }

    /// Poll until the receiving side of `heights` is dropped.
    pub async fn run(self, heights: mpsc::Sender<u64>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        tracing::info!(interval_ms = self.interval.as_millis() as u64, "Chain head monitor started");
        loop {
            ticker.tick().await;
            match self.source.block_number().await {
                Ok(height) => {
                    tracing::debug!(height, "Chain head polled");
                    if heights.send(height).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to fetch chain head, skipping tick");
                }
            }
        }
        tracing::info!("Chain head monitor stopped");
    }
}
