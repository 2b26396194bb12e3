//! Client stats aggregation sweep (spec §3/§4.9): folds `query_log` rows
//! into `clients.total_queries`/`blocked_count`/`nxdomain_count` on a tick,
//! so the hot path never writes to the client directory directly. Same
//! tick-and-delegate shape as [`crate::client_retention::ClientRetentionJob`],
//! just driving `ClientRepository::aggregate_from_query_log` instead.

use glory_hole_application::ports::ClientRepository;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

const DEFAULT_INTERVAL_SECS: u64 = 30;

pub struct ClientStatsAggregationJob {
    clients: Arc<dyn ClientRepository>,
    interval_secs: u64,
    shutdown: CancellationToken,
}

impl ClientStatsAggregationJob {
    pub fn new(clients: Arc<dyn ClientRepository>) -> Self {
        Self {
            clients,
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
        info!(interval_secs = self.interval_secs, "starting client stats aggregation job");

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
            loop {
                tokio::select! {
                    _ = self.shutdown.cancelled() => {
                        info!("client stats aggregation job shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        match self.clients.aggregate_from_query_log().await {
                            Ok(touched) => info!(touched, "client stats aggregation completed"),
                            Err(e) => error!(error = %e, "client stats aggregation failed"),
                        }
                    }
                }
            }
        });
    }
}
