//! Per-tenant route tables
//!
//! A route pairs one configured backend with its live health metrics.
//! Tables are owned exclusively by the registry and replaced wholesale
//! on reconfiguration; concurrent readers keep their `Arc` to the old
//! table and never observe a partially-rebuilt one.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use dashmap::DashMap;
use serde::Serialize;
use switchboard_config::TenantConfig;
use switchboard_core::Backend;

use crate::error::RouteError;

/// Live health metrics for one route, updated after every attempt
#[derive(Debug, Clone)]
pub struct RouteMetrics {
    /// Bounded reputation signal, clamped to [0, 100]
    pub health_score: u8,
    /// Exponentially weighted latency in milliseconds
    pub smoothed_latency_ms: f64,
    /// Exponentially weighted error rate in [0.0, 1.0]
    pub error_rate: f64,
    /// Unix timestamp of the last active probe
    pub last_health_check_unix: Option<u64>,
}

impl Default for RouteMetrics {
    fn default() -> Self {
        Self {
            health_score: 100,
            smoothed_latency_ms: 0.0,
            error_rate: 0.0,
            last_health_check_unix: None,
        }
    }
}

/// One configured backend for one tenant, with live state
///
/// Metrics sit behind a per-route mutex so that concurrent dispatches
/// apply their commutative score deltas without lost updates.
pub struct RouteState {
    backend_id: String,
    display_name: String,
    priority: u32,
    enabled: AtomicBool,
    metrics: Mutex<RouteMetrics>,
    backend: Arc<dyn Backend>,
}

impl RouteState {
    pub(crate) fn new(
        backend_id: String,
        display_name: String,
        priority: u32,
        enabled: bool,
        backend: Arc<dyn Backend>,
    ) -> Self {
        Self {
            backend_id,
            display_name,
            priority,
            enabled: AtomicBool::new(enabled),
            metrics: Mutex::new(RouteMetrics::default()),
            backend,
        }
    }

    /// Stable backend identifier
    pub fn backend_id(&self) -> &str {
        &self.backend_id
    }

    /// Selection priority, lower is preferred
    pub const fn priority(&self) -> u32 {
        self.priority
    }

    /// The adapter behind this route
    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    /// Whether this route participates in routing
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub(crate) fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    /// Run a closure against the metrics under the per-route lock
    pub(crate) fn with_metrics<T>(&self, f: impl FnOnce(&mut RouteMetrics) -> T) -> T {
        let mut metrics = self.metrics.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut metrics)
    }

    /// Current health score
    pub fn health_score(&self) -> u8 {
        self.with_metrics(|m| m.health_score)
    }

    /// Immutable snapshot for status reporting
    pub fn snapshot(&self) -> Route {
        let metrics = self.with_metrics(|m| m.clone());
        Route {
            backend_id: self.backend_id.clone(),
            display_name: self.display_name.clone(),
            priority: self.priority,
            enabled: self.is_enabled(),
            health_score: metrics.health_score,
            smoothed_latency_ms: metrics.smoothed_latency_ms,
            error_rate: metrics.error_rate,
            last_health_check_unix: metrics.last_health_check_unix,
        }
    }
}

impl std::fmt::Debug for RouteState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteState")
            .field("backend_id", &self.backend_id)
            .field("priority", &self.priority)
            .field("enabled", &self.is_enabled())
            .finish_non_exhaustive()
    }
}

/// Serializable snapshot of one route
#[derive(Debug, Clone, Serialize)]
pub struct Route {
    /// Stable backend identifier
    pub backend_id: String,
    /// Human-readable name
    pub display_name: String,
    /// Selection priority, lower is preferred
    pub priority: u32,
    /// Whether this route participates in routing
    pub enabled: bool,
    /// Bounded reputation signal in [0, 100]
    pub health_score: u8,
    /// Exponentially weighted latency in milliseconds
    pub smoothed_latency_ms: f64,
    /// Exponentially weighted error rate in [0.0, 1.0]
    pub error_rate: f64,
    /// Unix timestamp of the last active probe
    pub last_health_check_unix: Option<u64>,
}

/// All routes for one tenant, in configuration order
#[derive(Debug)]
pub struct RouteTable {
    routes: Vec<Arc<RouteState>>,
}

impl RouteTable {
    /// All routes, enabled or not
    pub fn routes(&self) -> &[Arc<RouteState>] {
        &self.routes
    }

    /// Find a route by backend id
    pub fn get(&self, backend_id: &str) -> Option<&Arc<RouteState>> {
        self.routes.iter().find(|r| r.backend_id() == backend_id)
    }
}

/// Registry of route tables, sharded by tenant id
pub struct RouteRegistry {
    tables: DashMap<String, Arc<RouteTable>>,
    floor: u8,
}

impl RouteRegistry {
    /// Create an empty registry with the given eligibility floor
    pub fn new(floor: u8) -> Self {
        Self {
            tables: DashMap::new(),
            floor,
        }
    }

    /// Build (or rebuild) the route table for a tenant
    ///
    /// Replaces any existing table atomically. Each configured backend
    /// must come with an adapter instance keyed by backend id.
    pub fn initialize(
        &self,
        tenant: &str,
        config: &TenantConfig,
        adapters: &HashMap<String, Arc<dyn Backend>>,
    ) -> Result<(), RouteError> {
        if config.backends.is_empty() {
            return Err(RouteError::Configuration {
                tenant: tenant.to_owned(),
                reason: "no backends configured".to_owned(),
            });
        }

        let mut routes = Vec::with_capacity(config.backends.len());
        for backend_config in &config.backends {
            let Some(backend) = adapters.get(&backend_config.id) else {
                return Err(RouteError::Configuration {
                    tenant: tenant.to_owned(),
                    reason: format!("no adapter registered for backend '{}'", backend_config.id),
                });
            };

            routes.push(Arc::new(RouteState::new(
                backend_config.id.clone(),
                backend_config.display_name().to_owned(),
                backend_config.priority,
                backend_config.enabled,
                Arc::clone(backend),
            )));
        }

        tracing::info!(tenant, routes = routes.len(), "route table initialized");
        self.tables.insert(tenant.to_owned(), Arc::new(RouteTable { routes }));
        Ok(())
    }

    /// Get the tenant's route table
    pub fn table(&self, tenant: &str) -> Result<Arc<RouteTable>, RouteError> {
        self.tables
            .get(tenant)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| RouteError::UnknownTenant {
                tenant: tenant.to_owned(),
            })
    }

    /// Routes currently eligible for selection
    ///
    /// A route is eligible when it is enabled and its health score is
    /// strictly above the floor.
    pub fn eligible(&self, tenant: &str) -> Result<Vec<Arc<RouteState>>, RouteError> {
        let table = self.table(tenant)?;
        Ok(table
            .routes()
            .iter()
            .filter(|r| r.is_enabled() && r.health_score() > self.floor)
            .map(Arc::clone)
            .collect())
    }

    /// Re-enable a backend, resetting its health score to 100
    pub fn enable(&self, tenant: &str, backend_id: &str) -> Result<(), RouteError> {
        let route = self.route(tenant, backend_id)?;
        route.set_enabled(true);
        route.with_metrics(|m| m.health_score = 100);
        tracing::info!(tenant, backend = backend_id, "backend enabled");
        Ok(())
    }

    /// Take a backend out of rotation without deleting it
    pub fn disable(&self, tenant: &str, backend_id: &str) -> Result<(), RouteError> {
        let route = self.route(tenant, backend_id)?;
        route.set_enabled(false);
        tracing::info!(tenant, backend = backend_id, "backend disabled");
        Ok(())
    }

    /// Snapshot all routes for a tenant
    pub fn status(&self, tenant: &str) -> Result<Vec<Route>, RouteError> {
        let table = self.table(tenant)?;
        Ok(table.routes().iter().map(|r| r.snapshot()).collect())
    }

    /// All tenant ids with an initialized table
    pub fn tenants(&self) -> Vec<String> {
        self.tables.iter().map(|entry| entry.key().clone()).collect()
    }

    fn route(&self, tenant: &str, backend_id: &str) -> Result<Arc<RouteState>, RouteError> {
        let table = self.table(tenant)?;
        table
            .get(backend_id)
            .map(Arc::clone)
            .ok_or_else(|| RouteError::UnknownBackend {
                tenant: tenant.to_owned(),
                backend: backend_id.to_owned(),
            })
    }
}
