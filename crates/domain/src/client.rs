use std::net::IpAddr;
use std::time::SystemTime;

/// A client discovered lazily on first query. Updated from the query-log
/// aggregation pipeline, never from the hot path (spec §3).
#[derive(Debug, Clone)]
pub struct Client {
    pub ip: IpAddr,
    pub first_seen: SystemTime,
    pub last_seen: SystemTime,
    pub total_queries: u64,
    pub blocked_count: u64,
    pub nxdomain_count: u64,
    pub name: Option<String>,
    pub notes: Option<String>,
    pub group: Option<String>,
}

impl Client {
    pub fn new(ip: IpAddr, now: SystemTime) -> Self {
        Self {
            ip,
            first_seen: now,
            last_seen: now,
            total_queries: 0,
            blocked_count: 0,
            nxdomain_count: 0,
            name: None,
            notes: None,
            group: None,
        }
    }
}
