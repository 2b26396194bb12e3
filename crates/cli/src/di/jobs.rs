//! Wires the background sweeps to the adapters built in
//! [`super::adapters::Adapters`], grounded on the teacher's `di::use_cases`
//! DI shape: one function that takes the constructed ports and a config and
//! returns a fully configured runner.

use super::adapters::Adapters;
use glory_hole_application::ports::{ClientRepository, PatternSetPort, QueryLogPort, RateLimiterPort, ResponseCachePort};
use glory_hole_domain::config::Config;
use glory_hole_jobs::{CacheMaintenanceJob, ClientRetentionJob, ClientStatsAggregationJob, JobRunner, PatternReloadJob, QueryLogRetentionJob, RateLimiterSweepJob, WalCheckpointJob};
use sqlx::SqlitePool;
use tokio_util::sync::CancellationToken;

pub fn build_runner(adapters: &Adapters, config: &Config, pool: SqlitePool, shutdown: CancellationToken) -> JobRunner {
    let blocklist: std::sync::Arc<dyn PatternSetPort> = adapters.blocklist.clone();
    let whitelist: std::sync::Arc<dyn PatternSetPort> = adapters.whitelist.clone();
    let cache: std::sync::Arc<dyn ResponseCachePort> = adapters.cache.clone();
    let rate_limiter: std::sync::Arc<dyn RateLimiterPort> = adapters.rate_limiter.clone();
    let query_log: std::sync::Arc<dyn QueryLogPort> = adapters.query_log.clone();
    let clients: std::sync::Arc<dyn ClientRepository> = adapters.clients.clone();

    let blocklist_reload = PatternReloadJob::new(
        blocklist,
        config.blocking.blocklist_exact.clone(),
        config.blocking.blocklist_wildcards.clone(),
        config.blocking.blocklist_patterns.clone(),
    )
    .with_interval(config.blocking.update_interval_secs);

    let whitelist_reload = PatternReloadJob::new(
        whitelist,
        config.blocking.whitelist_exact.clone(),
        config.blocking.whitelist_wildcards.clone(),
        config.blocking.whitelist_patterns.clone(),
    )
    .with_interval(config.blocking.update_interval_secs);

    JobRunner::new()
        .with_pattern_reload(blocklist_reload)
        .with_pattern_reload(whitelist_reload)
        .with_cache_maintenance(CacheMaintenanceJob::new(cache))
        .with_rate_limiter_sweep(RateLimiterSweepJob::new(rate_limiter))
        .with_query_log_retention(QueryLogRetentionJob::new(query_log, config.database.retention_days))
        .with_client_retention(ClientRetentionJob::new(clients.clone(), config.database.retention_days))
        .with_client_stats_aggregation(ClientStatsAggregationJob::new(clients))
        .with_wal_checkpoint(WalCheckpointJob::new(pool, config.database.wal_checkpoint_interval_secs))
        .with_shutdown_token(shutdown)
}
