//! Glory-Hole background jobs.
//!
//! Periodic sweeps that keep the query-processing engine's state current
//! without sitting on the request hot path: pattern-set reload, cache
//! eviction, rate-limiter bucket eviction, and the two SQLite retention
//! sweeps. Each job owns its own `tokio::spawn`'d loop and is wired into a
//! single `JobRunner` that fans out a shared shutdown token.

pub mod cache_maintenance;
pub mod client_retention;
pub mod client_stats_aggregation;
pub mod pattern_reload;
pub mod query_log_retention;
pub mod rate_limiter_sweep;
pub mod runner;
pub mod wal_checkpoint;

pub use cache_maintenance::CacheMaintenanceJob;
pub use client_retention::ClientRetentionJob;
pub use client_stats_aggregation::ClientStatsAggregationJob;
pub use pattern_reload::PatternReloadJob;
pub use query_log_retention::QueryLogRetentionJob;
pub use rate_limiter_sweep::RateLimiterSweepJob;
pub use runner::JobRunner;
pub use wal_checkpoint::WalCheckpointJob;
