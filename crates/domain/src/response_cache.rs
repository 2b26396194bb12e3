use crate::domain_name::DomainName;
use crate::record::RecordType;
use std::time::{Duration, SystemTime};

/// Key into the response cache: (qname, qtype, qclass). DNS class is almost
/// always IN; it is still modeled explicitly per spec §4.4 so a future
/// CH/HS query never collides with an IN entry of the same name/type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub qname: DomainName,
    pub qtype: RecordType,
    pub qclass: u16,
}

impl CacheKey {
    pub const CLASS_IN: u16 = 1;

    pub fn new(qname: DomainName, qtype: RecordType, qclass: u16) -> Self {
        Self {
            qname,
            qtype,
            qclass,
        }
    }
}

/// A cached upstream response. `wire` holds the raw answer bytes (opaque to
/// this crate — infrastructure owns the wire-format type); `domain` keeps
/// only the bookkeeping spec §3/§4.4 require of the cache itself.
#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub wire: Vec<u8>,
    pub cached_at: SystemTime,
    pub expires_at: SystemTime,
    pub last_access: SystemTime,
    pub byte_size: usize,
    pub negative: bool,
}

impl CachedResponse {
    pub fn new(wire: Vec<u8>, ttl: Duration, now: SystemTime, negative: bool) -> Self {
        let byte_size = wire.len();
        Self {
            wire,
            cached_at: now,
            expires_at: now + ttl,
            last_access: now,
            byte_size,
            negative,
        }
    }

    /// Seconds remaining before this entry expires, as of `now`. Zero once
    /// expired — callers treat zero as a miss (spec §4.4 invariant b).
    pub fn remaining_ttl_secs(&self, now: SystemTime) -> u32 {
        self.expires_at
            .duration_since(now)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(0)
    }

    pub fn is_expired(&self, now: SystemTime) -> bool {
        self.remaining_ttl_secs(now) == 0
    }
}

/// Clamp a response TTL into the configured [min_ttl, max_ttl] window;
/// negative responses (NXDOMAIN, NOERROR-no-answer) always use
/// `negative_ttl` regardless of the answer's own TTL.
pub fn effective_ttl(answer_ttl: u32, negative: bool, min_ttl: u32, max_ttl: u32, negative_ttl: u32) -> Duration {
    let secs = if negative {
        negative_ttl
    } else {
        answer_ttl.clamp(min_ttl, max_ttl)
    };
    Duration::from_secs(secs as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_applies_min_and_max() {
        assert_eq!(effective_ttl(5, false, 60, 86400, 30), Duration::from_secs(60));
        assert_eq!(effective_ttl(999_999, false, 60, 86400, 30), Duration::from_secs(86400));
        assert_eq!(effective_ttl(300, false, 60, 86400, 30), Duration::from_secs(300));
    }

    #[test]
    fn negative_responses_use_negative_ttl() {
        assert_eq!(effective_ttl(86400, true, 60, 86400, 30), Duration::from_secs(30));
    }

    #[test]
    fn remaining_ttl_hits_zero_after_expiry() {
        let now = SystemTime::now();
        let entry = CachedResponse::new(vec![1, 2, 3], Duration::from_secs(1), now, false);
        assert_eq!(entry.remaining_ttl_secs(now + Duration::from_secs(5)), 0);
        assert!(entry.is_expired(now + Duration::from_secs(5)));
    }
}
