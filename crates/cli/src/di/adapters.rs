//! Builds every infrastructure adapter and wires them into a
//! [`HandleQueryUseCase`], the same "construct concrete adapters, hand them
//! to the use case behind their ports" shape as the teacher's
//! `di::Repositories`/`di::UseCases`, collapsed to this gateway's single
//! orchestration use case.

use super::config_adapt;
use glory_hole_application::ports::{LocalRecordsPort, PatternSetPort, PolicyEnginePort, QueryLogPort};
use glory_hole_application::HandleQueryUseCase;
use glory_hole_domain::config::Config;
use glory_hole_domain::{DnsError, PatternSetKind};
use glory_hole_infrastructure::{
    HickoryWireCodec, LocalRecordsStore, PatternStore, QueryLogWriter, RateLimiter, RhaiPolicyEngine, ShardedResponseCache, SqliteClientRepository,
    UpstreamForwarder,
};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub struct Adapters {
    pub blocklist: Arc<PatternStore>,
    pub whitelist: Arc<PatternStore>,
    pub cache: Arc<ShardedResponseCache>,
    pub local_records: Arc<LocalRecordsStore>,
    pub policy: Arc<RhaiPolicyEngine>,
    pub rate_limiter: Arc<RateLimiter>,
    pub forwarder: Arc<UpstreamForwarder>,
    pub query_log: Arc<QueryLogWriter>,
    pub clients: Arc<SqliteClientRepository>,
}

impl Adapters {
    pub async fn build(config: &Config, pool: SqlitePool, shutdown: CancellationToken) -> Result<Self, DnsError> {
        let blocklist = Arc::new(PatternStore::new(PatternSetKind::Block));
        blocklist
            .reload(
                config.blocking.blocklist_exact.clone(),
                config.blocking.blocklist_wildcards.clone(),
                config.blocking.blocklist_patterns.clone(),
            )
            .await?;

        let whitelist = Arc::new(PatternStore::new(PatternSetKind::Allow));
        whitelist
            .reload(
                config.blocking.whitelist_exact.clone(),
                config.blocking.whitelist_wildcards.clone(),
                config.blocking.whitelist_patterns.clone(),
            )
            .await?;

        let cache = Arc::new(ShardedResponseCache::new(config.cache.max_entries, config.cache.shard_count.max(1)));

        let local_records = Arc::new(LocalRecordsStore::new());
        let records = config
            .local_records
            .records
            .iter()
            .map(config_adapt::local_record_from_config)
            .collect::<Result<Vec<_>, _>>()?;
        local_records.reload(records)?;

        let policy = Arc::new(RhaiPolicyEngine::new());
        let rule_sources = config.policy.rules.iter().map(config_adapt::policy_rule_source).collect::<Result<Vec<_>, _>>()?;
        policy.reload(rule_sources)?;

        let overrides = config
            .rate_limit
            .overrides
            .iter()
            .map(config_adapt::rate_limit_override_from_config)
            .collect::<Result<Vec<_>, _>>()?;
        let rate_limiter = Arc::new(RateLimiter::new(
            config.rate_limit.requests_per_second,
            config.rate_limit.burst,
            config_adapt::on_exceed_action(config.rate_limit.on_exceed),
            overrides,
            config.rate_limit.max_tracked_clients,
            Duration::from_secs(config.rate_limit.idle_eviction_secs),
        ));

        let forwarder = Arc::new(UpstreamForwarder::new(
            &config.upstream.servers,
            Duration::from_millis(config.upstream.timeout_ms),
            config.upstream.retries,
        )?);

        let query_log = Arc::new(QueryLogWriter::new(
            pool.clone(),
            config.database.buffer_size,
            config.database.batch_size,
            Duration::from_millis(config.database.flush_interval_ms),
            shutdown,
        ));

        let clients = Arc::new(SqliteClientRepository::new(pool));

        Ok(Self {
            blocklist,
            whitelist,
            cache,
            local_records,
            policy,
            rate_limiter,
            forwarder,
            query_log,
            clients,
        })
    }

    pub fn build_handler(&self, config: &Config) -> Arc<HandleQueryUseCase> {
        let encoder = Arc::new(HickoryWireCodec::new());
        let query_log: Arc<dyn QueryLogPort> = self.query_log.clone();

        let use_case = HandleQueryUseCase::new(
            self.cache.clone(),
            self.local_records.clone(),
            self.policy.clone(),
            self.whitelist.clone(),
            self.blocklist.clone(),
            self.rate_limiter.clone(),
            self.forwarder.clone(),
            encoder,
            query_log,
            config.local_records.max_cname_chain_depth,
            config.cache.min_ttl,
            config.cache.max_ttl,
            config.cache.negative_ttl,
        );

        Arc::new(use_case)
    }
}
