use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use super::BackgroundTask;
use crate::cache::ResponseStore;

/// Periodically purges expired entries from a [`ResponseStore`].
///
/// Lookups already refuse expired entries; the sweeper exists for keys that
/// are never looked up again.
#[derive(Debug, Clone)]
pub struct Sweeper {
    store: Arc<ResponseStore>,
    interval: Duration,
}

impl Sweeper {
    pub fn new(store: Arc<ResponseStore>, interval: Duration) -> Self {
        Self { store, interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Runs one sweep cycle and returns how many entries it removed.
    ///
    /// Entries removed or refreshed by someone else between the scan and the
    /// removal are skipped.
    pub fn sweep_once(&self) -> usize {
        let now = Instant::now();
        let mut expired = Vec::new();
        self.store.for_each(|key, entry| {
            if entry.is_expired_at(now) {
                expired.push(key.clone());
            }
        });

        let removed = expired
            .iter()
            .filter(|key| self.store.invalidate_expired(key, now))
            .count();
        if removed > 0 {
            debug!(removed, remaining = self.store.len(), "swept expired cache entries");
        } else {
            trace!("cache sweep found nothing to remove");
        }
        removed
    }

    /// Sweeps every `interval` until `shutdown` is cancelled.
    ///
    /// The first sweep happens one full interval after the call, and each
    /// later one a full interval after the previous sweep finished. An
    /// interval too long to schedule leaves the sweeper idle until shutdown.
    pub async fn run_until(self, shutdown: CancellationToken) {
        loop {
            let Some(deadline) = Instant::now().checked_add(self.interval) else {
                warn!(interval = ?self.interval, "sweep interval out of range, sweeper idle");
                shutdown.cancelled().await;
                break;
            };
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep_until(deadline) => {
                    self.sweep_once();
                }
            }
        }
        debug!("cache sweeper stopped");
    }
}

impl BackgroundTask for Sweeper {
    fn name(&self) -> &'static str {
        "response-cache-sweeper"
    }

    fn run(self: Box<Self>, shutdown: CancellationToken) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(self.run_until(shutdown))
    }
}
