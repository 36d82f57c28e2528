use std::time::Duration;

use serde::{Deserialize, Serialize};

mod defaults {
    pub const fn send_timeout_secs() -> u64 {
        10
    }

    pub const fn max_conflict_retries() -> usize {
        5
    }
}

/// Settings shared by the email and sender config reconcilers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    /// Upper bound on a single provider call (in seconds)
    ///
    /// Default: 10 seconds
    #[serde(default = "defaults::send_timeout_secs")]
    pub send_timeout_secs: u64,

    /// Reload-and-retry rounds after a conflicting status write, per reconcile
    ///
    /// Default: 5
    #[serde(default = "defaults::max_conflict_retries")]
    pub max_conflict_retries: usize,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            send_timeout_secs: defaults::send_timeout_secs(),
            max_conflict_retries: defaults::max_conflict_retries(),
        }
    }
}

impl ReconcilerConfig {
    #[must_use]
    pub const fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.send_timeout_secs)
    }
}
