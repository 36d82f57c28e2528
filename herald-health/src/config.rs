//! Health check configuration

use serde::{Deserialize, Serialize};

mod defaults {
    pub const fn enabled() -> bool {
        true
    }

    pub fn listen_address() -> String {
        "[::]:8080".to_string()
    }

    pub const fn max_queue_depth() -> u64 {
        10_000
    }
}

/// Configuration for health check endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthConfig {
    /// Enable or disable the health check server
    #[serde(default = "defaults::enabled")]
    pub enabled: bool,

    /// Address to bind the health check server
    ///
    /// Common values:
    /// - `[::]:8080` (IPv6 any address, port 8080)
    /// - `0.0.0.0:8080` (IPv4 any address, port 8080)
    /// - `127.0.0.1:8080` (localhost only, port 8080)
    #[serde(default = "defaults::listen_address")]
    pub listen_address: String,

    /// Queued keys above which the readiness probe fails
    #[serde(default = "defaults::max_queue_depth")]
    pub max_queue_depth: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: defaults::enabled(),
            listen_address: defaults::listen_address(),
            max_queue_depth: defaults::max_queue_depth(),
        }
    }
}
