//! Periodic active-probe sweep
//!
//! Probes run independently of traffic so routes that recover during a
//! quiet period are rehabilitated before the next request arrives.
//! Multi-model tenants additionally get a primary-model probe, which is
//! what makes fail-back possible.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::failover::ModelFailover;
use crate::health;
use crate::router::{Router, RouterInner};

impl Router {
    /// Spawn the background probe loop
    ///
    /// Sweeps every route of every tenant at the configured interval,
    /// starting with an immediate sweep. Runs until the token is
    /// cancelled.
    pub fn spawn_probe_loop(&self, cancel: CancellationToken) -> JoinHandle<()> {
        let inner = Arc::clone(&self.inner);
        let interval = Duration::from_secs(inner.health.probe_interval_secs);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    () = cancel.cancelled() => {
                        tracing::debug!("probe loop stopped");
                        break;
                    }
                    _ = ticker.tick() => sweep(&inner).await,
                }
            }
        })
    }
}

async fn sweep(inner: &RouterInner) {
    for tenant in inner.registry.tenants() {
        let Ok(table) = inner.registry.table(&tenant) else {
            continue;
        };
        for route in table.routes() {
            health::active_probe(route).await;
        }
    }

    // Clone out of the map so no shard lock is held across an await
    let controllers: Vec<Arc<ModelFailover>> = inner
        .controllers
        .iter()
        .map(|entry| Arc::clone(entry.value()))
        .collect();
    for controller in controllers {
        controller.probe_primary().await;
    }

    tracing::debug!("probe sweep completed");
}
