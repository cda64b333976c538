use serde::{Deserialize, Serialize};

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub ward: WardConfig,
}

/// Ward scheduling configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WardConfig {
    /// Beds available per admission day. A slot locks once this many
    /// patients are fully confirmed for it.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    /// Minimum days between registration and the requested admission date.
    #[serde(default = "default_min_notice_days")]
    pub min_notice_days: i64,
}

impl Default for WardConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            min_notice_days: default_min_notice_days(),
        }
    }
}

fn default_capacity() -> usize {
    8
}

fn default_min_notice_days() -> i64 {
    14
}
