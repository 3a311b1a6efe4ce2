use serde::Deserialize;

/// What may move the active-model pointer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailoverTrigger {
    /// Only explicit switches move the pointer
    Manual,
    /// Failed attempts trigger automatic failover
    #[default]
    Automatic,
    /// Automatic failover plus operator switches
    Hybrid,
}

/// Multi-model failover settings for one tenant
///
/// Applies to the provider family that exposes several interchangeable
/// models behind one backend: a primary model plus an ordered fallback
/// tier.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MultiModelConfig {
    /// Which configured backend hosts the model family
    pub backend_id: String,
    /// Preferred model
    pub primary_model: String,
    /// Fallback models in descending priority
    #[serde(default)]
    pub fallback_models: Vec<String>,
    /// What may move the active-model pointer
    #[serde(default)]
    pub failover_trigger: FailoverTrigger,
    /// Health floor a candidate must clear during probing
    #[serde(default = "default_health_check_threshold")]
    pub health_check_threshold: u8,
    /// Switch back to the primary once it is observed healthy again
    #[serde(default)]
    pub failback_enabled: bool,
}

impl MultiModelConfig {
    /// All configured models, primary first
    pub fn models(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.primary_model.as_str()).chain(self.fallback_models.iter().map(String::as_str))
    }

    /// Whether automatic failover is in effect
    pub const fn auto_failover(&self) -> bool {
        matches!(self.failover_trigger, FailoverTrigger::Automatic | FailoverTrigger::Hybrid)
    }
}

const fn default_health_check_threshold() -> u8 {
    50
}
