use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub listen_address: String,
    pub tcp_enabled: bool,
    pub udp_enabled: bool,
    pub shutdown_grace_secs: u64,
    /// Per-request deadline (spec §5 "Cancellation"): the forwarder clamps
    /// every attempt to the minimum of this and its own per-upstream
    /// timeout, and the handler synthesizes SERVFAIL once it fires.
    pub request_deadline_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: "0.0.0.0:53".to_string(),
            tcp_enabled: true,
            udp_enabled: true,
            shutdown_grace_secs: 5,
            request_deadline_ms: 4_500,
        }
    }
}
