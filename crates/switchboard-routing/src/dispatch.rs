//! Dispatch engine: attempt, record, retry
//!
//! One logical request becomes up to `max_retries` attempts, each
//! against a route the strategy picked from the remaining candidates.
//! A route that fails an attempt is excluded from the rest of this
//! request's retries but stays in the table for future requests; its
//! health score carries the consequence instead.

use std::sync::Arc;
use std::time::{Duration, Instant};

use switchboard_config::DispatchConfig;
use switchboard_core::{BackendError, ChatRequest, ChatResponse};

use crate::error::RouteError;
use crate::health;
use crate::inflight::InFlightTracker;
use crate::registry::{RouteRegistry, RouteState};
use crate::stats::{AttemptStat, StatsWriter};
use crate::strategy::Selector;

/// Runs the attempt loop for plain (single-model) routing
pub(crate) struct DispatchEngine {
    config: DispatchConfig,
    stats: StatsWriter,
}

impl DispatchEngine {
    pub(crate) fn new(config: DispatchConfig, stats: StatsWriter) -> Self {
        Self { config, stats }
    }

    pub(crate) fn per_attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.config.per_attempt_timeout_ms)
    }

    /// Dispatch one request for a tenant
    ///
    /// Caller cancellation is dropping the returned future; the RAII
    /// in-flight guard and the per-attempt timeout keep accounting and
    /// transport state correct in that case.
    pub(crate) async fn dispatch(
        &self,
        tenant: &str,
        request: &ChatRequest,
        registry: &RouteRegistry,
        selector: &Selector,
        inflight: &InFlightTracker,
    ) -> Result<ChatResponse, RouteError> {
        let eligible = registry.eligible(tenant)?;
        if eligible.is_empty() {
            return Err(RouteError::NoBackendsAvailable {
                tenant: tenant.to_owned(),
            });
        }

        let budget = if self.config.failover_enabled {
            self.config.max_retries.min(eligible.len()).max(1)
        } else {
            1
        };

        let mut failed_ids: Vec<String> = Vec::new();
        let mut last_error: Option<BackendError> = None;

        for attempt in 0..budget {
            // Re-filter each attempt: a prior failure may have pushed a
            // route below the floor, and failed routes are excluded from
            // this request's remaining retries either way
            let candidates: Vec<Arc<RouteState>> = registry
                .eligible(tenant)?
                .into_iter()
                .filter(|r| !failed_ids.iter().any(|id| id == r.backend_id()))
                .collect();

            let Some(route) = selector.select(tenant, &candidates, inflight) else {
                break;
            };

            match self.attempt(tenant, &route, request, inflight).await {
                Ok(response) => return Ok(response),
                Err(e) if !e.is_retryable() => {
                    return Err(RouteError::InvalidRequest(e.to_string()));
                }
                Err(e) => {
                    tracing::warn!(
                        tenant,
                        backend = route.backend_id(),
                        attempt,
                        error = %e,
                        "attempt failed"
                    );
                    failed_ids.push(route.backend_id().to_owned());
                    last_error = Some(e);
                }
            }
        }

        Err(RouteError::AllBackendsFailed {
            tenant: tenant.to_owned(),
            last_error: last_error.map_or_else(|| "no attempts made".to_owned(), |e| e.to_string()),
        })
    }

    /// One attempt against one route
    async fn attempt(
        &self,
        tenant: &str,
        route: &Arc<RouteState>,
        request: &ChatRequest,
        inflight: &InFlightTracker,
    ) -> Result<ChatResponse, BackendError> {
        let _guard = inflight.acquire(tenant, route.backend_id());
        let start = Instant::now();

        // Dropping the timed-out chat future cancels the underlying
        // request where the transport supports it
        let result = match tokio::time::timeout(self.per_attempt_timeout(), route.backend().chat(request)).await
        {
            Ok(r) => r,
            Err(_) => Err(BackendError::Timeout),
        };

        let latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        match &result {
            Ok(_) => {
                #[allow(clippy::cast_precision_loss)]
                health::record_success(route, latency_ms as f64);
            }
            Err(e) => health::record_failure(route, e.kind()),
        }

        self.stats.emit(AttemptStat {
            tenant_id: tenant.to_owned(),
            target: route.backend_id().to_owned(),
            latency_ms,
            success: result.is_ok(),
            error_kind: result.as_ref().err().map(BackendError::kind),
            timestamp_unix: health::now_secs(),
        });

        result
    }
}

impl std::fmt::Debug for DispatchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchEngine").field("config", &self.config).finish_non_exhaustive()
    }
}
