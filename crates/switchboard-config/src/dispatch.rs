use serde::Deserialize;

/// How the dispatch engine picks one route from the eligible set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStrategy {
    /// Highest health score, then lowest priority number
    #[default]
    Priority,
    /// Per-tenant rotating counter over the eligible set
    RoundRobin,
    /// Fewest in-flight requests
    LeastConnections,
    /// Weighted by health and smoothed latency
    ResponseTime,
}

/// Dispatch engine settings
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchConfig {
    /// Route selection strategy
    #[serde(default)]
    pub strategy: SelectionStrategy,
    /// Whether a failed attempt may be retried against another route
    #[serde(default = "default_failover_enabled")]
    pub failover_enabled: bool,
    /// Upper bound on attempts per logical request
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    /// Per-attempt timeout in milliseconds
    #[serde(default = "default_per_attempt_timeout_ms")]
    pub per_attempt_timeout_ms: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            strategy: SelectionStrategy::default(),
            failover_enabled: default_failover_enabled(),
            max_retries: default_max_retries(),
            per_attempt_timeout_ms: default_per_attempt_timeout_ms(),
        }
    }
}

const fn default_failover_enabled() -> bool {
    true
}

const fn default_max_retries() -> usize {
    3
}

const fn default_per_attempt_timeout_ms() -> u64 {
    30_000
}
