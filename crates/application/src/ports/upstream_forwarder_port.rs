use async_trait::async_trait;
use glory_hole_domain::DnsError;
use std::time::Instant;

/// Outcome of a successful upstream round trip.
#[derive(Debug, Clone)]
pub struct ForwardedResponse {
    pub wire: Vec<u8>,
    pub upstream: String,
    pub latency_ms: u64,
}

/// Recursive forwarder, per spec §4.8: UDP first, TCP retry on a truncated
/// (TC-bit) response, round-robins across configured upstreams, and
/// preserves any EDNS0 OPT record the client sent.
///
/// `deadline` is the request's overall cutoff (spec §5 "Cancellation"): each
/// attempt's socket timeout is clamped to the minimum of the remaining time
/// until `deadline` and the forwarder's own per-upstream timeout, and a
/// deadline that has already passed fails fast without attempting anything.
#[async_trait]
pub trait UpstreamForwarderPort: Send + Sync {
    async fn forward(&self, query_wire: &[u8], deadline: Instant) -> Result<ForwardedResponse, DnsError>;
}
