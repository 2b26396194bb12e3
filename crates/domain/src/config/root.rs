use serde::{Deserialize, Serialize};

use super::blocking::BlockingConfig;
use super::cache::CacheConfig;
use super::database::DatabaseConfig;
use super::errors::ConfigError;
use super::local_records::LocalRecordsConfig;
use super::logging::LoggingConfig;
use super::policy::PolicyConfig;
use super::rate_limit::RateLimitConfig;
use super::server::ServerConfig;
use super::upstream::UpstreamConfig;

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub blocking: BlockingConfig,
    #[serde(default)]
    pub local_records: LocalRecordsConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let config = if let Some(path) = path {
            Self::from_file(path)?
        } else if std::path::Path::new("glory-hole.toml").exists() {
            Self::from_file("glory-hole.toml")?
        } else if std::path::Path::new("/etc/glory-hole/config.toml").exists() {
            Self::from_file("/etc/glory-hole/config.toml")?
        } else {
            Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.to_string(), e.to_string()))?;
        toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.server.tcp_enabled && !self.server.udp_enabled {
            return Err(ConfigError::Validation(
                "at least one of tcp_enabled / udp_enabled must be true".to_string(),
            ));
        }
        if self.upstream.servers.is_empty() {
            return Err(ConfigError::Validation(
                "no upstream servers configured".to_string(),
            ));
        }
        if self.cache.min_ttl > self.cache.max_ttl {
            return Err(ConfigError::Validation(
                "cache.min_ttl must be <= cache.max_ttl".to_string(),
            ));
        }
        Ok(())
    }
}
