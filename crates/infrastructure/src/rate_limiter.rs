//! Per-client token-bucket rate limiter (spec §4.7).
//!
//! Grounded on the teacher's `DashMap<IpAddr, _, FxBuildHasher>` idiom for
//! per-client state: buckets are created lazily on first contact and swept
//! by a periodic idle-eviction job rather than bounded synchronously on the
//! hot path.

use dashmap::DashMap;
use glory_hole_application::ports::RateLimiterPort;
use glory_hole_domain::{RateLimitAction, RateLimitOverride, TokenBucket};
use ipnetwork::IpNetwork;
use rustc_hash::FxBuildHasher;
use std::net::IpAddr;
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

struct BucketParams {
    capacity: f64,
    refill_per_sec: f64,
    on_exceed: RateLimitAction,
}

pub struct RateLimiter {
    buckets: DashMap<IpAddr, Mutex<TokenBucket>, FxBuildHasher>,
    default_params: BucketParams,
    overrides: Vec<RateLimitOverride>,
    max_tracked_clients: usize,
    idle_threshold: Duration,
}

impl RateLimiter {
    pub fn new(
        requests_per_second: f64,
        burst: f64,
        on_exceed: RateLimitAction,
        overrides: Vec<RateLimitOverride>,
        max_tracked_clients: usize,
        idle_threshold: Duration,
    ) -> Self {
        Self {
            buckets: DashMap::with_hasher(FxBuildHasher),
            default_params: BucketParams {
                capacity: burst,
                refill_per_sec: requests_per_second,
                on_exceed,
            },
            overrides,
            max_tracked_clients,
            idle_threshold,
        }
    }

    fn params_for(&self, ip: IpAddr) -> (f64, f64, RateLimitAction) {
        for over in &self.overrides {
            if matches_cidr(&over.cidr, ip) {
                return (over.capacity_hint(), over.requests_per_second, over.on_exceed);
            }
        }
        (self.default_params.capacity, self.default_params.refill_per_sec, self.default_params.on_exceed)
    }
}

fn matches_cidr(cidr: &IpNetwork, ip: IpAddr) -> bool {
    cidr.contains(ip)
}

impl RateLimiterPort for RateLimiter {
    fn check(&self, client_ip: IpAddr) -> Option<RateLimitAction> {
        let now = SystemTime::now();
        let (capacity, refill_per_sec, on_exceed) = self.params_for(client_ip);

        let entry = self
            .buckets
            .entry(client_ip)
            .or_insert_with(|| Mutex::new(TokenBucket::new(capacity, refill_per_sec, now)));

        let mut bucket = entry.lock().unwrap();
        if bucket.try_consume(now) {
            None
        } else {
            Some(on_exceed)
        }
    }

    fn tracked_clients(&self) -> usize {
        self.buckets.len()
    }

    fn evict_idle(&self) -> usize {
        let now = SystemTime::now();
        let before = self.buckets.len();

        self.buckets.retain(|_, bucket| bucket.lock().unwrap().idle_for(now) < self.idle_threshold);

        if self.buckets.len() > self.max_tracked_clients {
            let mut by_idle: Vec<(IpAddr, Duration)> = self
                .buckets
                .iter()
                .map(|entry| (*entry.key(), entry.value().lock().unwrap().idle_for(now)))
                .collect();
            by_idle.sort_by(|a, b| b.1.cmp(&a.1));
            let overflow = self.buckets.len() - self.max_tracked_clients;
            for (ip, _) in by_idle.into_iter().take(overflow) {
                self.buckets.remove(&ip);
            }
        }

        before - self.buckets.len()
    }
}

trait OverrideExt {
    fn capacity_hint(&self) -> f64;
}

impl OverrideExt for RateLimitOverride {
    fn capacity_hint(&self) -> f64 {
        self.burst
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glory_hole_domain::RateLimitAction;
    use std::net::Ipv4Addr;
    use std::str::FromStr;

    #[test]
    fn admits_burst_then_denies() {
        let limiter = RateLimiter::new(5.0, 3.0, RateLimitAction::Nxdomain, vec![], 100, Duration::from_secs(3600));
        let ip = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));
        assert!(limiter.check(ip).is_none());
        assert!(limiter.check(ip).is_none());
        assert!(limiter.check(ip).is_none());
        assert_eq!(limiter.check(ip), Some(RateLimitAction::Nxdomain));
    }

    #[test]
    fn cidr_override_takes_precedence_over_default() {
        let override_entry = RateLimitOverride {
            cidr: IpNetwork::from_str("192.168.0.0/16").unwrap(),
            requests_per_second: 1000.0,
            burst: 1000.0,
            on_exceed: RateLimitAction::Drop,
        };
        let limiter = RateLimiter::new(1.0, 1.0, RateLimitAction::Nxdomain, vec![override_entry], 100, Duration::from_secs(3600));
        let ip = IpAddr::V4(Ipv4Addr::new(192, 168, 1, 50));
        for _ in 0..50 {
            assert!(limiter.check(ip).is_none());
        }
    }

    #[test]
    fn idle_eviction_removes_stale_buckets() {
        let limiter = RateLimiter::new(5.0, 5.0, RateLimitAction::Nxdomain, vec![], 100, Duration::from_millis(1));
        let ip = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2));
        limiter.check(ip);
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(limiter.evict_idle(), 1);
        assert_eq!(limiter.tracked_clients(), 0);
    }

    #[test]
    fn max_tracked_clients_evicts_oldest_idle_first() {
        let limiter = RateLimiter::new(5.0, 5.0, RateLimitAction::Nxdomain, vec![], 2, Duration::from_secs(3600));
        limiter.check(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)));
        std::thread::sleep(Duration::from_millis(5));
        limiter.check(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)));
        std::thread::sleep(Duration::from_millis(5));
        limiter.check(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 3)));
        limiter.evict_idle();
        assert_eq!(limiter.tracked_clients(), 2);
    }
}
