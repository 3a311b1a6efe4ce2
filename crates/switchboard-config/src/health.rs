use serde::Deserialize;

/// Health tracking settings
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HealthConfig {
    /// Routes at or below this score are not eligible for selection
    #[serde(default = "default_floor")]
    pub floor: u8,
    /// Interval between active probe sweeps, in seconds
    #[serde(default = "default_probe_interval_secs")]
    pub probe_interval_secs: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            floor: default_floor(),
            probe_interval_secs: default_probe_interval_secs(),
        }
    }
}

const fn default_floor() -> u8 {
    50
}

const fn default_probe_interval_secs() -> u64 {
    300
}
