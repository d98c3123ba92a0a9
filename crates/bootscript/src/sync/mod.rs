//! Reconciliation worker
//!
//! One long-lived task per sync-capable provider. It calls
//! [`SyncProvider::sync`] on the provider's interval, backs off on a Fibonacci
//! sequence while syncs fail, and exits when the shutdown channel flips to
//! `true` or its sender is dropped.

pub mod backoff;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::provider::{SyncOutcome, SyncProvider};
pub use backoff::FibonacciBackoff;

/// Consecutive failures after which each further failure logs at error level
const ESCALATE_AFTER: u32 = 3;

/// Background sync loop for one provider
pub struct SyncWorker {
    provider: Arc<dyn SyncProvider>,
    backoff: FibonacciBackoff,
}

impl std::fmt::Debug for SyncWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncWorker")
            .field("interval", &self.provider.sync_interval())
            .field("backoff", &self.backoff)
            .finish_non_exhaustive()
    }
}

impl SyncWorker {
    pub fn new(provider: Arc<dyn SyncProvider>) -> Self {
        Self {
            provider,
            backoff: FibonacciBackoff::default(),
        }
    }

    #[must_use]
    pub fn with_backoff(mut self, backoff: FibonacciBackoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Run until shutdown
    ///
    /// The first sync happens immediately.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let interval = self.provider.sync_interval();
        let mut consecutive_failures = 0u32;
        let mut delay = Duration::ZERO;

        info!("Starting provider sync worker, interval={}s", interval.as_secs());

        loop {
            tokio::select! {
                () = tokio::time::sleep(delay) => {
                    delay = match self.provider.sync().await {
                        Ok(outcome) => {
                            if consecutive_failures > 0 {
                                info!("Provider sync recovered after {} failures", consecutive_failures);
                            }
                            consecutive_failures = 0;
                            self.backoff.reset();
                            match outcome {
                                SyncOutcome::Refreshed(count) => debug!("Provider sync published {} nodes", count),
                                SyncOutcome::Unchanged => debug!("Provider sync found no changes"),
                            }
                            interval
                        }
                        Err(e) => {
                            consecutive_failures += 1;
                            let retry = self.backoff.next_backoff();
                            if consecutive_failures >= ESCALATE_AFTER {
                                error!(
                                    "Provider sync failed {} consecutive times, retrying in {}s: {}",
                                    consecutive_failures, retry.as_secs(), e
                                );
                            } else {
                                warn!("Provider sync failed (attempt {}), retrying in {}s: {}", consecutive_failures, retry.as_secs(), e);
                            }
                            retry
                        }
                    };
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Provider sync worker shutting down");
                        break;
                    }
                }
            }
        }
    }
}

/// Spawn a sync worker for `provider`
pub fn start_sync_worker(provider: Arc<dyn SyncProvider>, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
    let worker = SyncWorker::new(provider);
    tokio::spawn(worker.run(shutdown))
}
