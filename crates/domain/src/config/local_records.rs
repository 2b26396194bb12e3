use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LocalRecordConfig {
    pub name: String,
    pub record_type: String,
    pub ttl: u32,
    pub value: String,
    #[serde(default)]
    pub priority: Option<u16>,
    #[serde(default)]
    pub weight: Option<u16>,
    #[serde(default)]
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct LocalRecordsConfig {
    pub enabled: bool,
    #[serde(default)]
    pub records: Vec<LocalRecordConfig>,
    #[serde(default = "default_chain_depth")]
    pub max_cname_chain_depth: u32,
}

fn default_chain_depth() -> u32 {
    10
}
