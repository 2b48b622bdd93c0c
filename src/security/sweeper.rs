//! Periodic purge of closed rate-limit windows.
//!
//! Runs as its own task, independent of request traffic. It only ever
//! removes entries whose window has already closed, so it never competes
//! with an `increment` that is extending a live entry.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time;

use crate::observability::metrics;
use crate::security::store::RateLimitStore;

pub struct StoreSweeper {
    store: Arc<dyn RateLimitStore>,
    interval: Duration,
}

impl StoreSweeper {
    pub fn new(store: Arc<dyn RateLimitStore>, interval: Duration) -> Self {
        Self { store, interval }
    }

    /// Sweep on every tick until shutdown is signalled.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(interval_secs = self.interval.as_secs(), "Rate-limit sweeper starting");

        let mut ticker = time::interval(self.interval);
        // The first tick completes immediately; there is nothing to purge yet.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep_once();
                }
                _ = shutdown.recv() => {
                    tracing::info!("Rate-limit sweeper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Run a single purge pass.
    pub fn sweep_once(&self) -> usize {
        let removed = self.store.purge_expired();
        let remaining = self.store.entry_count();
        metrics::record_sweep(removed, remaining);
        tracing::debug!(removed, remaining = ?remaining, "Rate-limit sweep complete");
        removed
    }
}
