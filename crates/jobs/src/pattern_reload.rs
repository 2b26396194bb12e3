//! Periodic pattern-set reload sweep (spec §4.2/§4.3), grounded on the
//! teacher's `BlocklistSyncJob`: same tick-and-reload shape, generalized to
//! run against either the blocklist or the whitelist `PatternSetPort`
//! instance, since both share the same atomic-snapshot machinery. Config
//! parsing itself stays out of the core's scope — this job re-applies the
//! same already-typed source lists it was constructed with, which is what
//! makes the reload idempotent rather than a config file watcher.

use glory_hole_application::ports::PatternSetPort;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

pub struct PatternReloadJob {
    store: Arc<dyn PatternSetPort>,
    exact: Vec<String>,
    wildcards: Vec<String>,
    regexes: Vec<String>,
    interval_secs: u64,
    shutdown: CancellationToken,
}

impl PatternReloadJob {
    pub fn new(store: Arc<dyn PatternSetPort>, exact: Vec<String>, wildcards: Vec<String>, regexes: Vec<String>) -> Self {
        Self {
            store,
            exact,
            wildcards,
            regexes,
            interval_secs: 86_400,
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
        let kind = self.store.kind();
        info!(?kind, interval_secs = self.interval_secs, "starting pattern reload job");

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = self.shutdown.cancelled() => {
                        info!(?kind, "pattern reload job shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        match self.store.reload(self.exact.clone(), self.wildcards.clone(), self.regexes.clone()).await {
                            Ok(()) => info!(?kind, len = self.store.len(), "pattern set reload completed"),
                            Err(e) => error!(?kind, error = %e, "pattern set reload failed"),
                        }
                    }
                }
            }
        });
    }
}
