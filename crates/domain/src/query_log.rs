use std::net::IpAddr;
use std::time::SystemTime;

/// One row of the query log, per spec §3/§6. Written asynchronously by the
/// query-log writer; ordering in the durable store is by `timestamp`, not
/// by submission order (concurrent handlers may finish and enqueue out of
/// order).
#[derive(Debug, Clone)]
pub struct QueryLogEntry {
    pub timestamp: SystemTime,
    pub client_ip: IpAddr,
    pub domain: String,
    pub query_type: String,
    pub response_code: String,
    pub blocked: bool,
    pub cached: bool,
    pub response_time_ms: u64,
    pub upstream_used: Option<String>,
    pub total_latency_ms: u64,
    pub upstream_latency_ms: Option<u64>,
}

#[derive(Debug, Clone, Default)]
pub struct QueryStats {
    pub total_queries: u64,
    pub blocked_queries: u64,
    pub cached_queries: u64,
    pub nxdomain_queries: u64,
}
