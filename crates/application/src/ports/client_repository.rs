use async_trait::async_trait;
use glory_hole_domain::{Client, DnsError};

/// Clients are discovered lazily, the first time their IP appears in the
/// query log (spec §3); this port carries no hot-path write at all, only
/// the aggregation pass and the read/retention sides the handler and jobs
/// use.
#[async_trait]
pub trait ClientRepository: Send + Sync {
    async fn get_all(&self, limit: u32, offset: u32) -> Result<Vec<Client>, DnsError>;

    async fn delete_older_than(&self, days: u32) -> Result<u64, DnsError>;

    /// Fold every query-log row written since the last call into the
    /// clients table: new IPs are inserted, `total_queries`/`blocked_count`/
    /// `nxdomain_count` accumulate, and `last_seen` advances. Returns the
    /// number of distinct client IPs touched. Run by the aggregation job,
    /// never from the query hot path (spec §3, §4.9).
    async fn aggregate_from_query_log(&self) -> Result<u64, DnsError>;
}
