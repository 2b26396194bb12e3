pub mod blocking;
pub mod cache;
pub mod database;
pub mod errors;
pub mod local_records;
pub mod logging;
pub mod policy;
pub mod rate_limit;
pub mod root;
pub mod server;
pub mod upstream;

pub use blocking::BlockingConfig;
pub use cache::CacheConfig;
pub use database::DatabaseConfig;
pub use errors::ConfigError;
pub use local_records::{LocalRecordConfig, LocalRecordsConfig};
pub use logging::LoggingConfig;
pub use policy::{PolicyConfig, PolicyRuleConfig};
pub use rate_limit::{OnExceedAction, RateLimitConfig, RateLimitOverrideConfig};
pub use root::Config;
pub use server::ServerConfig;
pub use upstream::UpstreamConfig;
