//! Rate-limiter idle-bucket eviction sweep (spec §4.7), same tick-loop
//! shape as [`crate::cache_maintenance::CacheMaintenanceJob`] applied to
//! `RateLimiterPort::evict_idle` instead of cache entries.

use glory_hole_application::ports::RateLimiterPort;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

const DEFAULT_INTERVAL_SECS: u64 = 300;

pub struct RateLimiterSweepJob {
    limiter: Arc<dyn RateLimiterPort>,
    interval_secs: u64,
    shutdown: CancellationToken,
}

impl RateLimiterSweepJob {
    pub fn new(limiter: Arc<dyn RateLimiterPort>) -> Self {
        Self {
            limiter,
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
        info!(interval_secs = self.interval_secs, "starting rate limiter sweep job");

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
            loop {
                tokio::select! {
                    _ = self.shutdown.cancelled() => {
                        info!("rate limiter sweep job shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        let evicted = self.limiter.evict_idle();
                        if evicted > 0 {
                            info!(evicted, tracked = self.limiter.tracked_clients(), "rate limiter eviction cycle completed");
                        }
                    }
                }
            }
        });
    }
}
