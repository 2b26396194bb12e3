//! Glory-Hole Domain Layer
//!
//! Pure data types and validation for the query-processing engine. No I/O,
//! no async runtime — everything here is safe to construct and test without
//! a socket, a database, or a clock other than `std::time`.

pub mod client;
pub mod config;
pub mod domain_name;
pub mod errors;
pub mod pattern;
pub mod policy;
pub mod query_log;
pub mod query_request;
pub mod rate_limit;
pub mod rcode;
pub mod record;
pub mod response_cache;

pub use client::Client;
pub use config::Config;
pub use domain_name::DomainName;
pub use errors::{DnsError, ErrorKind};
pub use pattern::{wildcard_matches, PatternEntry, PatternSetKind};
pub use policy::{EvaluationContext, PolicyAction, PolicyRule};
pub use query_log::{QueryLogEntry, QueryStats};
pub use query_request::QueryRequest;
pub use rate_limit::{RateLimitAction, RateLimitOverride, TokenBucket};
pub use rcode::Rcode;
pub use record::{CaaTag, LocalRecord, RecordData, RecordType};
pub use response_cache::{CacheKey, CachedResponse};
