//! Glory-Hole Infrastructure Layer
//!
//! Concrete adapters behind the application layer's ports: atomic pattern
//! store (blocklist/whitelist), sharded response cache, local-records
//! store, rhai-backed policy engine, token-bucket rate limiter, SQLite
//! query log and client directory, the UDP/TCP upstream forwarder, the
//! hickory-proto wire codec, and the UDP/TCP listener pair.

pub mod client_repository;
pub mod forwarder;
pub mod listener;
pub mod local_records_store;
pub mod pattern_store;
pub mod policy_engine;
pub mod query_log_writer;
pub mod rate_limiter;
pub mod response_cache;
pub mod schema;
pub mod wire_codec;

pub use client_repository::SqliteClientRepository;
pub use forwarder::UpstreamForwarder;
pub use local_records_store::LocalRecordsStore;
pub use pattern_store::PatternStore;
pub use policy_engine::RhaiPolicyEngine;
pub use query_log_writer::QueryLogWriter;
pub use rate_limiter::RateLimiter;
pub use response_cache::{CacheStats, ShardedResponseCache};
pub use wire_codec::HickoryWireCodec;
