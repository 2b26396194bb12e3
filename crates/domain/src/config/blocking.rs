use serde::{Deserialize, Serialize};

/// Pattern sets handed to the core pre-parsed, per spec §1 ("blocklist
/// *downloading* ... is out of scope — the core consumes a parsed domain
/// set") and §6's contract ("blocklist downloader hands the core
/// `(exact_set, wildcard_list, regex_list)`").
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct BlockingConfig {
    pub enabled: bool,
    #[serde(default)]
    pub blocklist_exact: Vec<String>,
    #[serde(default)]
    pub blocklist_wildcards: Vec<String>,
    #[serde(default)]
    pub blocklist_patterns: Vec<String>,
    #[serde(default)]
    pub whitelist_exact: Vec<String>,
    #[serde(default)]
    pub whitelist_wildcards: Vec<String>,
    #[serde(default)]
    pub whitelist_patterns: Vec<String>,
    pub auto_update_blocklists: bool,
    pub update_interval_secs: u64,
}
