//! Route selection strategies
//!
//! Every strategy takes the eligible route set and returns exactly one
//! route. Ties are always broken by priority ascending, then backend
//! id, so selections are reproducible in tests.

use std::cmp::Ordering;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;

use dashmap::DashMap;
use switchboard_config::SelectionStrategy;

use crate::inflight::InFlightTracker;
use crate::registry::RouteState;

pub mod least_connections;
pub mod priority;
pub mod response_time;
pub mod round_robin;

/// Picks one route from the eligible set per the configured strategy
///
/// Owns the per-tenant round-robin counters. The counters persist
/// across calls for fairness but are deliberately not reset when the
/// eligible set changes, so fairness under churn is best-effort.
pub struct Selector {
    strategy: SelectionStrategy,
    round_robin: DashMap<String, AtomicU64>,
}

impl Selector {
    /// Create a selector for the given strategy
    pub fn new(strategy: SelectionStrategy) -> Self {
        Self {
            strategy,
            round_robin: DashMap::new(),
        }
    }

    /// Select one route from the eligible set
    pub fn select(
        &self,
        tenant: &str,
        eligible: &[Arc<RouteState>],
        inflight: &InFlightTracker,
    ) -> Option<Arc<RouteState>> {
        let selected = match self.strategy {
            SelectionStrategy::Priority => priority::select(eligible),
            SelectionStrategy::RoundRobin => {
                let counter = self.round_robin.entry(tenant.to_owned()).or_default();
                round_robin::select(eligible, counter.value())
            }
            SelectionStrategy::LeastConnections => least_connections::select(tenant, eligible, inflight),
            SelectionStrategy::ResponseTime => response_time::select(eligible),
        };

        if let Some(ref route) = selected {
            tracing::debug!(
                tenant,
                strategy = ?self.strategy,
                backend = route.backend_id(),
                "route selected"
            );
        }

        selected
    }
}

impl std::fmt::Debug for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Selector").field("strategy", &self.strategy).finish_non_exhaustive()
    }
}

/// Deterministic tie-break: priority ascending, then backend id
pub(crate) fn tie_break(a: &RouteState, b: &RouteState) -> Ordering {
    a.priority()
        .cmp(&b.priority())
        .then_with(|| a.backend_id().cmp(b.backend_id()))
}
