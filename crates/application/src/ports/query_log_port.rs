use async_trait::async_trait;
use glory_hole_domain::{QueryLogEntry, QueryStats};

/// Buffered, async query-log sink, per spec §4.9. `submit` never blocks the
/// query path: it pushes onto a channel and returns immediately, dropping
/// (and counting) the entry if the channel is full rather than applying
/// backpressure to the handler.
#[async_trait]
pub trait QueryLogPort: Send + Sync {
    fn submit(&self, entry: QueryLogEntry);

    async fn recent(&self, limit: u32) -> Result<Vec<QueryLogEntry>, glory_hole_domain::DnsError>;

    async fn stats(&self) -> Result<QueryStats, glory_hole_domain::DnsError>;

    /// Delete rows older than `retention_days`. Run by the retention job.
    async fn delete_older_than(&self, retention_days: u32) -> Result<u64, glory_hole_domain::DnsError>;
}
