use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PolicyRuleConfig {
    pub name: String,
    pub logic: String,
    pub action: String,
    #[serde(default)]
    pub action_data: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct PolicyConfig {
    pub enabled: bool,
    #[serde(default)]
    pub rules: Vec<PolicyRuleConfig>,
}
