//! Per-tenant in-flight request accounting
//!
//! Counts are attributed per (tenant, backend) pair and consumed by
//! the least-connections strategy. The RAII guard keeps the invariant
//! that a counter is decremented exactly once per acquisition, even
//! when the dispatch future is cancelled mid-attempt.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use dashmap::DashMap;

/// Tracks in-flight request counts per (tenant, backend)
#[derive(Debug, Default)]
pub struct InFlightTracker {
    counts: DashMap<String, Arc<AtomicI64>>,
}

impl InFlightTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment the counter and return a guard that decrements on drop
    pub fn acquire(&self, tenant: &str, backend_id: &str) -> InFlightGuard {
        let counter = Arc::clone(
            self.counts
                .entry(key(tenant, backend_id))
                .or_insert_with(|| Arc::new(AtomicI64::new(0)))
                .value(),
        );
        counter.fetch_add(1, Ordering::Relaxed);
        InFlightGuard { counter }
    }

    /// Current in-flight count for a (tenant, backend) pair
    pub fn count(&self, tenant: &str, backend_id: &str) -> i64 {
        self.counts
            .get(&key(tenant, backend_id))
            .map_or(0, |c| c.load(Ordering::Relaxed))
    }
}

fn key(tenant: &str, backend_id: &str) -> String {
    format!("{tenant}/{backend_id}")
}

/// Decrements its counter on drop; never below zero
#[derive(Debug)]
pub struct InFlightGuard {
    counter: Arc<AtomicI64>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        // fetch_update so a stray double-drop elsewhere can never push
        // the counter negative
        let _ = self
            .counter
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| Some((v - 1).max(0)));
    }
}
