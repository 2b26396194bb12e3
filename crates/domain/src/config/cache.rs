use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    pub enabled: bool,
    pub max_entries: usize,
    pub min_ttl: u32,
    pub max_ttl: u32,
    pub negative_ttl: u32,
    /// Power of two; 0 means the legacy single-shard mode (spec §4.4).
    pub shard_count: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 10_000,
            min_ttl: 60,
            max_ttl: 86_400,
            negative_ttl: 30,
            shard_count: 16,
        }
    }
}
