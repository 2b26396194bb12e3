use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub path: String,
    pub buffer_size: usize,
    pub flush_interval_ms: u64,
    pub batch_size: usize,
    pub retention_days: u32,
    pub wal_checkpoint_interval_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "glory-hole.db".to_string(),
            buffer_size: 4_096,
            flush_interval_ms: 1_000,
            batch_size: 200,
            retention_days: 30,
            wal_checkpoint_interval_secs: 300,
        }
    }
}
