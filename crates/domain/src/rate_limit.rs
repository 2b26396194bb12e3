use ipnetwork::IpNetwork;
use std::time::{Duration, SystemTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitAction {
    Drop,
    Delay,
    Nxdomain,
}

/// An override entry consulted before the default bucket parameters;
/// matched in configured order, first CIDR containing the client IP wins
/// (spec §4.7).
#[derive(Debug, Clone)]
pub struct RateLimitOverride {
    pub cidr: IpNetwork,
    pub requests_per_second: f64,
    pub burst: f64,
    pub on_exceed: RateLimitAction,
}

/// Pure token-bucket math: capacity, refill rate, and the last-refill
/// timestamp. The owning map (infrastructure) handles concurrent access;
/// this type is plain data so the refill/consume arithmetic is unit
/// testable without any locking machinery in the loop.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    pub tokens: f64,
    pub capacity: f64,
    pub refill_per_sec: f64,
    pub last_refill: SystemTime,
}

impl TokenBucket {
    pub fn new(capacity: f64, refill_per_sec: f64, now: SystemTime) -> Self {
        Self {
            tokens: capacity,
            capacity,
            refill_per_sec,
            last_refill: now,
        }
    }

    /// Refill based on elapsed time, then attempt to consume one token.
    /// Returns `true` if the request is admitted.
    pub fn try_consume(&mut self, now: SystemTime) -> bool {
        self.refill(now);
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    fn refill(&mut self, now: SystemTime) {
        let elapsed = now
            .duration_since(self.last_refill)
            .unwrap_or(Duration::ZERO)
            .as_secs_f64();
        if elapsed > 0.0 {
            self.tokens = (self.tokens + elapsed * self.refill_per_sec).min(self.capacity);
            self.last_refill = now;
        }
    }

    pub fn idle_for(&self, now: SystemTime) -> Duration {
        now.duration_since(self.last_refill).unwrap_or(Duration::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_conservation_over_window() {
        // rps=5, burst=10: in a 3s window at most floor(10 + 5*3) = 25 admits.
        let mut bucket = TokenBucket::new(10.0, 5.0, SystemTime::UNIX_EPOCH);
        let mut admitted = 0u32;
        let mut t = SystemTime::UNIX_EPOCH;
        // Fire one request every 100ms for 3 seconds (30 attempts).
        for _ in 0..30 {
            if bucket.try_consume(t) {
                admitted += 1;
            }
            t += Duration::from_millis(100);
        }
        assert!(admitted as f64 <= 10.0 + 5.0 * 3.0);
    }

    #[test]
    fn burst_allows_immediate_admits_up_to_capacity() {
        let mut bucket = TokenBucket::new(10.0, 5.0, SystemTime::UNIX_EPOCH);
        let mut admitted = 0;
        for _ in 0..10 {
            if bucket.try_consume(SystemTime::UNIX_EPOCH) {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 10);
        assert!(!bucket.try_consume(SystemTime::UNIX_EPOCH));
    }

    #[test]
    fn refill_caps_at_capacity() {
        let mut bucket = TokenBucket::new(5.0, 100.0, SystemTime::UNIX_EPOCH);
        bucket.try_consume(SystemTime::UNIX_EPOCH);
        let later = SystemTime::UNIX_EPOCH + Duration::from_secs(10);
        bucket.refill(later);
        assert_eq!(bucket.tokens, 5.0);
    }
}
