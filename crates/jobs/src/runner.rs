//! Wires every background sweep to a shared shutdown token and starts them
//! together, adapted from the teacher's `JobRunner`. The two pattern-set
//! reload jobs (blocklist and whitelist) share one type, so they're held in
//! a `Vec` rather than two named fields the way the teacher's distinct job
//! types allowed.

use crate::{CacheMaintenanceJob, ClientRetentionJob, ClientStatsAggregationJob, PatternReloadJob, QueryLogRetentionJob, RateLimiterSweepJob, WalCheckpointJob};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub struct JobRunner {
    pattern_reloads: Vec<PatternReloadJob>,
    cache_maintenance: Option<CacheMaintenanceJob>,
    rate_limiter_sweep: Option<RateLimiterSweepJob>,
    query_log_retention: Option<QueryLogRetentionJob>,
    client_retention: Option<ClientRetentionJob>,
    client_stats_aggregation: Option<ClientStatsAggregationJob>,
    wal_checkpoint: Option<WalCheckpointJob>,
    shutdown: Option<CancellationToken>,
}

impl JobRunner {
    pub fn new() -> Self {
        Self {
            pattern_reloads: Vec::new(),
            cache_maintenance: None,
            rate_limiter_sweep: None,
            query_log_retention: None,
            client_retention: None,
            client_stats_aggregation: None,
            wal_checkpoint: None,
            shutdown: None,
        }
    }

    pub fn with_pattern_reload(mut self, job: PatternReloadJob) -> Self {
        self.pattern_reloads.push(job);
        self
    }

    pub fn with_cache_maintenance(mut self, job: CacheMaintenanceJob) -> Self {
        self.cache_maintenance = Some(job);
        self
    }

    pub fn with_rate_limiter_sweep(mut self, job: RateLimiterSweepJob) -> Self {
        self.rate_limiter_sweep = Some(job);
        self
    }

    pub fn with_query_log_retention(mut self, job: QueryLogRetentionJob) -> Self {
        self.query_log_retention = Some(job);
        self
    }

    pub fn with_client_retention(mut self, job: ClientRetentionJob) -> Self {
        self.client_retention = Some(job);
        self
    }

    pub fn with_client_stats_aggregation(mut self, job: ClientStatsAggregationJob) -> Self {
        self.client_stats_aggregation = Some(job);
        self
    }

    pub fn with_wal_checkpoint(mut self, job: WalCheckpointJob) -> Self {
        self.wal_checkpoint = Some(job);
        self
    }

    pub fn with_shutdown_token(mut self, token: CancellationToken) -> Self {
        self.shutdown = Some(token);
        self
    }

    pub async fn start(self) {
        info!("starting background job runner");

        for job in self.pattern_reloads {
            let job = match &self.shutdown {
                Some(token) => job.with_cancellation(token.clone()),
                None => job,
            };
            Arc::new(job).start().await;
        }

        if let Some(job) = self.cache_maintenance {
            let job = match &self.shutdown {
                Some(token) => job.with_cancellation(token.clone()),
                None => job,
            };
            Arc::new(job).start().await;
        }

        if let Some(job) = self.rate_limiter_sweep {
            let job = match &self.shutdown {
                Some(token) => job.with_cancellation(token.clone()),
                None => job,
            };
            Arc::new(job).start().await;
        }

        if let Some(job) = self.query_log_retention {
            let job = match &self.shutdown {
                Some(token) => job.with_cancellation(token.clone()),
                None => job,
            };
            Arc::new(job).start().await;
        }

        if let Some(job) = self.client_retention {
            let job = match &self.shutdown {
                Some(token) => job.with_cancellation(token.clone()),
                None => job,
            };
            Arc::new(job).start().await;
        }

        if let Some(job) = self.client_stats_aggregation {
            let job = match &self.shutdown {
                Some(token) => job.with_cancellation(token.clone()),
                None => job,
            };
            Arc::new(job).start().await;
        }

        if let Some(job) = self.wal_checkpoint {
            let job = match &self.shutdown {
                Some(token) => job.with_cancellation(token.clone()),
                None => job,
            };
            Arc::new(job).start().await;
        }

        info!("all background jobs started");
    }
}

impl Default for JobRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_runner_has_no_jobs_configured() {
        let runner = JobRunner::new();
        assert!(runner.pattern_reloads.is_empty());
        assert!(runner.cache_maintenance.is_none());
        assert!(runner.rate_limiter_sweep.is_none());
        assert!(runner.query_log_retention.is_none());
        assert!(runner.client_retention.is_none());
        assert!(runner.client_stats_aggregation.is_none());
        assert!(runner.wal_checkpoint.is_none());
    }
}
