mod client_repository;
mod local_records_port;
mod pattern_set_port;
mod policy_engine_port;
mod query_log_port;
mod rate_limiter_port;
mod response_cache_port;
mod response_encoder_port;
mod upstream_forwarder_port;

pub use client_repository::ClientRepository;
pub use local_records_port::{LocalLookupOutcome, LocalRecordsPort};
pub use pattern_set_port::PatternSetPort;
pub use policy_engine_port::{PolicyEnginePort, PolicyVerdict};
pub use query_log_port::QueryLogPort;
pub use rate_limiter_port::RateLimiterPort;
pub use response_cache_port::ResponseCachePort;
pub use response_encoder_port::ResponseEncoderPort;
pub use upstream_forwarder_port::{ForwardedResponse, UpstreamForwarderPort};
