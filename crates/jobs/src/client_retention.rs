//! Client directory retention sweep, symmetric to
//! [`crate::query_log_retention::QueryLogRetentionJob`] but targeting
//! `ClientRepository::delete_older_than`. The teacher's own equivalent
//! (`RetentionJob`, referenced from its job runner) sits in a source file
//! the retrieval pack didn't include; this job is built from the same
//! tick-and-delete shape the pack's other retention job demonstrates.

use glory_hole_application::ports::ClientRepository;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

const DEFAULT_INTERVAL_SECS: u64 = 86_400;

pub struct ClientRetentionJob {
    clients: Arc<dyn ClientRepository>,
    retention_days: u32,
    interval_secs: u64,
    shutdown: CancellationToken,
}

impl ClientRetentionJob {
    pub fn new(clients: Arc<dyn ClientRepository>, retention_days: u32) -> Self {
        Self {
            clients,
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
        info!(retention_days = self.retention_days, "starting client retention job");

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
            loop {
                tokio::select! {
                    _ = self.shutdown.cancelled() => {
                        info!("client retention job shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        match self.clients.delete_older_than(self.retention_days).await {
                            Ok(deleted) => info!(deleted, "client retention cleanup completed"),
                            Err(e) => error!(error = %e, "client retention cleanup failed"),
                        }
                    }
                }
            }
        });
    }
}
