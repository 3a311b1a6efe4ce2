use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

use crate::multi_model::MultiModelConfig;

/// Configuration for a single tenant (one organization's shared setup)
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TenantConfig {
    /// Ordered list of configured backends, most preferred first
    #[serde(default)]
    pub backends: Vec<BackendConfig>,
    /// Multi-model failover settings, for the provider family that
    /// exposes several interchangeable models
    #[serde(default)]
    pub multi_model: Option<MultiModelConfig>,
}

/// One configured upstream backend for a tenant
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackendConfig {
    /// Stable backend identifier
    pub id: String,
    /// Human-readable name; defaults to the id
    #[serde(default)]
    pub display_name: Option<String>,
    /// API key for authentication
    #[serde(default)]
    pub api_key: Option<SecretString>,
    /// Base URL override
    #[serde(default)]
    pub base_url: Option<Url>,
    /// Selection priority, lower is preferred
    #[serde(default = "default_priority")]
    pub priority: u32,
    /// Whether this backend participates in routing
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl BackendConfig {
    /// Display name, falling back to the backend id
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.id)
    }
}

const fn default_priority() -> u32 {
    100
}

const fn default_enabled() -> bool {
    true
}
