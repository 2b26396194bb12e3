use glory_hole_domain::RateLimitAction;
use std::net::IpAddr;

/// Per-client token-bucket admission control, per spec §4.7. `check`
/// consumes a token if one is available and returns the action to take
/// otherwise; it never blocks.
pub trait RateLimiterPort: Send + Sync {
    /// Returns `None` when the request is admitted, `Some(action)` when the
    /// client's bucket is empty and `action` says what the handler should
    /// do about it.
    fn check(&self, client_ip: IpAddr) -> Option<RateLimitAction>;

    fn tracked_clients(&self) -> usize;

    /// Drop buckets idle for longer than the configured eviction window.
    fn evict_idle(&self) -> usize;
}
