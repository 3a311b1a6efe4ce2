//! Configuration for the Switchboard router
//!
//! Deserialized from TOML. Per-tenant backend lists and multi-model
//! settings come from the persistence layer of the surrounding
//! platform; this crate only defines their shape and validation.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod dispatch;
mod health;
mod loader;
mod multi_model;
mod tenant;

use indexmap::IndexMap;
use serde::Deserialize;

pub use dispatch::{DispatchConfig, SelectionStrategy};
pub use health::HealthConfig;
pub use multi_model::{FailoverTrigger, MultiModelConfig};
pub use tenant::{BackendConfig, TenantConfig};

/// Top-level router configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Tenant configurations keyed by tenant id
    #[serde(default)]
    pub tenants: IndexMap<String, TenantConfig>,
    /// Dispatch engine settings
    #[serde(default)]
    pub dispatch: DispatchConfig,
    /// Health tracking settings
    #[serde(default)]
    pub health: HealthConfig,
}
