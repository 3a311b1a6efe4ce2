//! Router facade tying the routing pieces together
//!
//! One [`Router`] serves every tenant. Plain tenants go through the
//! dispatch engine; tenants with a multi-model section are intercepted
//! by their [`ModelFailover`] controller, which manages a single
//! active-model pointer instead of the route table.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use switchboard_config::{DispatchConfig, HealthConfig, TenantConfig};
use switchboard_core::{Backend, ChatRequest, ChatResponse};

use crate::dispatch::DispatchEngine;
use crate::error::RouteError;
use crate::events::{EventSink, EventWriter, FailoverReason, MemoryEventLog};
use crate::failover::{ActiveModelStatus, ModelFailover};
use crate::inflight::InFlightTracker;
use crate::registry::{Route, RouteRegistry};
use crate::stats::{StatsSink, StatsWriter, TracingStatsSink};
use crate::strategy::Selector;

/// How many failover events a status query returns
const HISTORY_LIMIT: usize = 20;

/// Multi-tenant request router
///
/// Cheap to clone; all state lives behind the shared inner. Must be
/// created inside a tokio runtime because the sink writers spawn their
/// worker tasks on construction.
#[derive(Clone)]
pub struct Router {
    pub(crate) inner: Arc<RouterInner>,
}

pub(crate) struct RouterInner {
    pub(crate) registry: RouteRegistry,
    pub(crate) selector: Selector,
    pub(crate) inflight: InFlightTracker,
    pub(crate) engine: DispatchEngine,
    pub(crate) controllers: DashMap<String, Arc<ModelFailover>>,
    pub(crate) health: HealthConfig,
    pub(crate) stats: StatsWriter,
    pub(crate) events: EventWriter,
    pub(crate) event_sink: Arc<dyn EventSink>,
}

impl Router {
    /// Create a router with the default sinks (tracing stats, in-memory
    /// event log)
    pub fn new(dispatch: DispatchConfig, health: HealthConfig) -> Self {
        Self::with_sinks(
            dispatch,
            health,
            Arc::new(TracingStatsSink),
            Arc::new(MemoryEventLog::default()),
        )
    }

    /// Create a router with explicit statistics and event sinks
    pub fn with_sinks(
        dispatch: DispatchConfig,
        health: HealthConfig,
        stats_sink: Arc<dyn StatsSink>,
        event_sink: Arc<dyn EventSink>,
    ) -> Self {
        let stats = StatsWriter::spawn(stats_sink);
        let events = EventWriter::spawn(Arc::clone(&event_sink));

        Self {
            inner: Arc::new(RouterInner {
                registry: RouteRegistry::new(health.floor),
                selector: Selector::new(dispatch.strategy),
                inflight: InFlightTracker::new(),
                engine: DispatchEngine::new(dispatch, stats.clone()),
                controllers: DashMap::new(),
                health,
                stats,
                events,
                event_sink,
            }),
        }
    }

    /// Build (or rebuild) the routing state for one tenant
    ///
    /// Adapters are keyed by backend id and must cover every configured
    /// backend. Replaces any previous state for the tenant atomically.
    pub fn initialize_tenant(
        &self,
        tenant: &str,
        config: &TenantConfig,
        adapters: &HashMap<String, Arc<dyn Backend>>,
    ) -> Result<(), RouteError> {
        self.inner.registry.initialize(tenant, config, adapters)?;

        if let Some(multi_model) = &config.multi_model {
            let Some(backend) = adapters.get(&multi_model.backend_id) else {
                return Err(RouteError::Configuration {
                    tenant: tenant.to_owned(),
                    reason: format!(
                        "multi-model backend '{}' has no adapter registered",
                        multi_model.backend_id
                    ),
                });
            };

            let controller = ModelFailover::new(
                tenant.to_owned(),
                Arc::clone(backend),
                multi_model.clone(),
                self.inner.engine.per_attempt_timeout(),
                self.inner.events.clone(),
                self.inner.stats.clone(),
            );
            self.inner.controllers.insert(tenant.to_owned(), Arc::new(controller));
        } else {
            self.inner.controllers.remove(tenant);
        }

        Ok(())
    }

    /// Dispatch one chat request for a tenant
    pub async fn dispatch(&self, tenant: &str, request: &ChatRequest) -> Result<ChatResponse, RouteError> {
        if let Some(controller) = self.controller(tenant) {
            return controller.dispatch(request).await;
        }

        self.inner
            .engine
            .dispatch(tenant, request, &self.inner.registry, &self.inner.selector, &self.inner.inflight)
            .await
    }

    /// Explicitly switch a multi-model tenant's active model
    pub async fn switch_model(
        &self,
        tenant: &str,
        target: &str,
        reason: FailoverReason,
    ) -> Result<(), RouteError> {
        let controller = self.controller(tenant).ok_or_else(|| RouteError::MultiModelNotConfigured {
            tenant: tenant.to_owned(),
        })?;
        controller.switch_model(target, reason).await
    }

    /// Snapshot all routes for a tenant
    pub fn route_status(&self, tenant: &str) -> Result<Vec<Route>, RouteError> {
        self.inner.registry.status(tenant)
    }

    /// Active-model status for a multi-model tenant
    pub async fn active_model_status(&self, tenant: &str) -> Result<ActiveModelStatus, RouteError> {
        let controller = self.controller(tenant).ok_or_else(|| RouteError::MultiModelNotConfigured {
            tenant: tenant.to_owned(),
        })?;
        let history = self.inner.event_sink.recent(tenant, HISTORY_LIMIT).await;
        Ok(controller.status(history))
    }

    /// Re-enable a backend, resetting its health
    pub fn enable_backend(&self, tenant: &str, backend_id: &str) -> Result<(), RouteError> {
        self.inner.registry.enable(tenant, backend_id)
    }

    /// Take a backend out of rotation
    pub fn disable_backend(&self, tenant: &str, backend_id: &str) -> Result<(), RouteError> {
        self.inner.registry.disable(tenant, backend_id)
    }

    fn controller(&self, tenant: &str) -> Option<Arc<ModelFailover>> {
        self.inner.controllers.get(tenant).map(|entry| Arc::clone(entry.value()))
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router").finish_non_exhaustive()
    }
}
