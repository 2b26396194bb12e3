//! Response cache eviction sweep (spec §4.4), grounded on the teacher's
//! `CacheMaintenanceJob`. The teacher ran two independent cycles (refresh
//! and compaction); this cache has no refresh-ahead concept, so a single
//! tick loop calling `evict_expired` covers the whole port.

use glory_hole_application::ports::ResponseCachePort;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

const DEFAULT_INTERVAL_SECS: u64 = 60;

pub struct CacheMaintenanceJob {
    cache: Arc<dyn ResponseCachePort>,
    interval_secs: u64,
    shutdown: CancellationToken,
}

impl CacheMaintenanceJob {
    pub fn new(cache: Arc<dyn ResponseCachePort>) -> Self {
        Self {
            cache,
            interval_secs: DEFAULT_INTERVAL_SECS,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_interval(mut self, interval_secs: u64) -> Self {
        self.interval_secs = interval_secs;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub async fn start(self: Arc<Self>) {
        info!(interval_secs = self.interval_secs, "starting cache maintenance job");

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
            loop {
                tokio::select! {
                    _ = self.shutdown.cancelled() => {
                        info!("cache maintenance job shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        let evicted = self.cache.evict_expired();
                        if evicted > 0 {
                            info!(evicted, remaining = self.cache.len(), "cache eviction cycle completed");
                        }
                    }
                }
            }
        });
    }
}
