//! Query-log retention sweep (spec §4.9), adapted from the teacher's
//! `QueryLogRetentionJob`: same daily tick calling a retention-days
//! deletion, targeting `QueryLogPort::delete_older_than` directly instead
//! of a dedicated cleanup use case.

use glory_hole_application::ports::QueryLogPort;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

const DEFAULT_INTERVAL_SECS: u64 = 86_400;

pub struct QueryLogRetentionJob {
    query_log: Arc<dyn QueryLogPort>,
    retention_days: u32,
    interval_secs: u64,
    shutdown: CancellationToken,
}

impl QueryLogRetentionJob {
    pub fn new(query_log: Arc<dyn QueryLogPort>, retention_days: u32) -> Self {
        Self {
            query_log,
            retention_days,
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
        info!(retention_days = self.retention_days, "starting query log retention job");

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
            loop {
                tokio::select! {
                    _ = self.shutdown.cancelled() => {
                        info!("query log retention job shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        match self.query_log.delete_older_than(self.retention_days).await {
                            Ok(deleted) => info!(deleted, "query log retention cleanup completed"),
                            Err(e) => error!(error = %e, "query log retention cleanup failed"),
                        }
                    }
                }
            }
        });
    }
}
