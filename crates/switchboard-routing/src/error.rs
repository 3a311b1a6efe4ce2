//! Routing-specific error types

use thiserror::Error;

/// Errors surfaced by the routing core
///
/// Per-attempt failures are converted into health-tracking updates and
/// never escape on their own; callers only see the terminal errors
/// below, carrying the last underlying error's message for diagnostics.
#[derive(Debug, Error)]
pub enum RouteError {
    /// Tenant backend configuration is unusable
    #[error("configuration error for tenant '{tenant}': {reason}")]
    Configuration {
        /// Tenant whose configuration is broken
        tenant: String,
        /// What is wrong with it
        reason: String,
    },

    /// No route table exists for the tenant
    #[error("unknown tenant: {tenant}")]
    UnknownTenant {
        /// Tenant id that was requested
        tenant: String,
    },

    /// The tenant has no backend with this id
    #[error("unknown backend '{backend}' for tenant '{tenant}'")]
    UnknownBackend {
        /// Tenant id
        tenant: String,
        /// Backend id that was requested
        backend: String,
    },

    /// Every route is disabled or below the health floor
    #[error("no backends currently available for tenant '{tenant}'")]
    NoBackendsAvailable {
        /// Tenant id
        tenant: String,
    },

    /// The retry budget was exhausted without a successful attempt
    #[error("all backends failed for tenant '{tenant}': {last_error}")]
    AllBackendsFailed {
        /// Tenant id
        tenant: String,
        /// Message of the last per-attempt error
        last_error: String,
    },

    /// Every configured model of the multi-model family was exhausted
    #[error("all models unavailable for tenant '{tenant}': {last_error}")]
    AllModelsUnavailable {
        /// Tenant id
        tenant: String,
        /// Message of the last per-attempt error
        last_error: String,
    },

    /// Manual switch rejected because the target failed its probe
    #[error("target model '{model}' is unhealthy")]
    TargetUnhealthy {
        /// Model that failed the probe
        model: String,
    },

    /// The model is not part of the tenant's configured family
    #[error("model '{model}' is not configured for tenant '{tenant}'")]
    UnknownModel {
        /// Tenant id
        tenant: String,
        /// Model that was requested
        model: String,
    },

    /// The tenant has no multi-model section configured
    #[error("multi-model failover is not configured for tenant '{tenant}'")]
    MultiModelNotConfigured {
        /// Tenant id
        tenant: String,
    },

    /// The request itself is malformed; retrying elsewhere cannot help
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}
