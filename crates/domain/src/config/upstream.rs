use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    pub servers: Vec<String>,
    pub timeout_ms: u64,
    pub retries: u32,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            servers: vec!["1.1.1.1:53".to_string(), "8.8.8.8:53".to_string()],
            timeout_ms: 2_000,
            retries: 2,
        }
    }
}
