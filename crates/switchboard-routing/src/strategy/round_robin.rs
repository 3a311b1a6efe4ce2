//! Round-robin strategy: rotate through the eligible set
//!
//! The per-tenant counter is monotonically increasing and survives
//! changes to the eligible set. When the set shrinks or grows between
//! calls the rotation restarts from a different offset, which is
//! accepted: round-robin fairness here is best-effort, not exact.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::registry::RouteState;

use super::tie_break;

/// Pick the next route in rotation order
pub fn select(eligible: &[Arc<RouteState>], counter: &AtomicU64) -> Option<Arc<RouteState>> {
    if eligible.is_empty() {
        return None;
    }

    // Stable ordering so the rotation is reproducible regardless of
    // the order the registry returned the routes in
    let mut ordered: Vec<&Arc<RouteState>> = eligible.iter().collect();
    ordered.sort_by(|a, b| tie_break(a, b));

    let turn = counter.fetch_add(1, Ordering::Relaxed) % ordered.len() as u64;
    let index = usize::try_from(turn).unwrap_or(0);
    Some(Arc::clone(ordered[index]))
}
