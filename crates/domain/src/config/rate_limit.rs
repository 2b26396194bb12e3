use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OnExceedAction {
    Drop,
    Delay,
    #[default]
    Nxdomain,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitOverrideConfig {
    pub cidr: String,
    pub requests_per_second: f64,
    pub burst: f64,
    #[serde(default)]
    pub on_exceed: OnExceedAction,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub requests_per_second: f64,
    pub burst: f64,
    pub on_exceed: OnExceedAction,
    pub max_tracked_clients: usize,
    pub idle_eviction_secs: u64,
    #[serde(default)]
    pub overrides: Vec<RateLimitOverrideConfig>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            requests_per_second: 20.0,
            burst: 40.0,
            on_exceed: OnExceedAction::Nxdomain,
            max_tracked_clients: 10_000,
            idle_eviction_secs: 3_600,
            overrides: Vec::new(),
        }
    }
}
