//! Multi-model failover controller
//!
//! Used for the provider family that exposes several interchangeable
//! models behind one backend: a primary model plus an ordered fallback
//! tier. The controller owns the per-tenant active-model pointer,
//! fails over automatically on attempt failure, supports explicit
//! manual switching, and can fail back to the primary once it is
//! observed healthy again.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::Serialize;
use switchboard_config::MultiModelConfig;
use switchboard_core::{Backend, BackendError, ChatRequest, ChatResponse, ErrorKind, Message};

use crate::error::RouteError;
use crate::events::{EventWriter, FailoverEvent, FailoverReason};
use crate::health;
use crate::stats::{AttemptStat, StatsWriter};

/// Budget for one synthetic model probe
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// The currently preferred model, with a monotonic version counter
///
/// Transitions are serialized through the mutex; the version makes
/// last-writer-wins observable when a manual switch races an automatic
/// failover.
#[derive(Debug, Clone)]
struct ActivePointer {
    model: String,
    version: u64,
}

/// Last known health of one model, from probes and attempts
#[derive(Debug, Clone, Copy)]
struct ModelHealth {
    score: u8,
    last_probe_healthy: Option<bool>,
}

impl Default for ModelHealth {
    fn default() -> Self {
        Self {
            score: 100,
            last_probe_healthy: None,
        }
    }
}

/// Status snapshot of one configured model
#[derive(Debug, Clone, Serialize)]
pub struct ModelStatus {
    /// Model identifier
    pub model: String,
    /// Bounded health score in [0, 100]
    pub health_score: u8,
    /// Outcome of the most recent probe, if any ran
    pub probe_healthy: Option<bool>,
}

/// Snapshot returned by `active_model_status`
#[derive(Debug, Clone, Serialize)]
pub struct ActiveModelStatus {
    /// Currently preferred model
    pub active_model: String,
    /// Monotonic transition counter
    pub version: u64,
    /// All configured models, primary first
    pub available_models: Vec<ModelStatus>,
    /// Recent failover history, newest first, read from the event sink
    pub recent_failovers: Vec<FailoverEvent>,
}

/// Per-tenant controller for one interchangeable model family
pub struct ModelFailover {
    tenant_id: String,
    backend: Arc<dyn Backend>,
    config: MultiModelConfig,
    active: Mutex<ActivePointer>,
    model_health: DashMap<String, ModelHealth>,
    per_attempt_timeout: Duration,
    events: EventWriter,
    stats: StatsWriter,
}

impl ModelFailover {
    pub(crate) fn new(
        tenant_id: String,
        backend: Arc<dyn Backend>,
        config: MultiModelConfig,
        per_attempt_timeout: Duration,
        events: EventWriter,
        stats: StatsWriter,
    ) -> Self {
        let active = ActivePointer {
            model: config.primary_model.clone(),
            version: 0,
        };
        Self {
            tenant_id,
            backend,
            config,
            active: Mutex::new(active),
            model_health: DashMap::new(),
            per_attempt_timeout,
            events,
            stats,
        }
    }

    /// Currently preferred model
    pub fn active_model(&self) -> String {
        self.active.lock().unwrap_or_else(PoisonError::into_inner).model.clone()
    }

    /// Dispatch one request, failing over across models as configured
    pub async fn dispatch(&self, request: &ChatRequest) -> Result<ChatResponse, RouteError> {
        let active = self.active_model();

        match self.attempt(&active, request).await {
            Ok(response) => {
                self.maybe_fail_back(&active);
                Ok(response)
            }
            Err(e) if !e.is_retryable() => Err(RouteError::InvalidRequest(e.to_string())),
            Err(e) => {
                // The family shares one credential, so a rejected key
                // cannot be cured by switching models
                if e.kind() == ErrorKind::Auth || !self.config.auto_failover() {
                    return Err(RouteError::AllModelsUnavailable {
                        tenant: self.tenant_id.clone(),
                        last_error: e.to_string(),
                    });
                }

                tracing::warn!(
                    tenant = %self.tenant_id,
                    model = %active,
                    error = %e,
                    "active model failed, attempting failover"
                );
                self.fail_over(&active, request, e).await
            }
        }
    }

    /// Explicitly switch the active model
    ///
    /// Available regardless of the failover trigger mode. The target is
    /// probed first; an unhealthy target is rejected and the pointer is
    /// left unchanged.
    pub async fn switch_model(&self, target: &str, reason: FailoverReason) -> Result<(), RouteError> {
        if !self.config.models().any(|m| m == target) {
            return Err(RouteError::UnknownModel {
                tenant: self.tenant_id.clone(),
                model: target.to_owned(),
            });
        }

        let from = self.active_model();

        if !self.probe(target).await {
            self.emit_event(&from, target, reason, false, Some("health probe failed".to_owned()));
            return Err(RouteError::TargetUnhealthy {
                model: target.to_owned(),
            });
        }

        self.set_active(target);
        self.emit_event(&from, target, reason, true, None);
        Ok(())
    }

    /// Run a synthetic probe against one model
    ///
    /// The adapter contract has no per-model health call, so the probe
    /// is a one-token chat with the model override applied.
    pub async fn probe(&self, model: &str) -> bool {
        let request = ChatRequest {
            model: Some(model.to_owned()),
            messages: vec![Message::user("ping")],
            max_tokens: Some(1),
            temperature: None,
            stream: false,
        };

        let healthy = matches!(
            tokio::time::timeout(PROBE_TIMEOUT, self.backend.chat(&request)).await,
            Ok(Ok(_))
        );

        self.model_health
            .entry(model.to_owned())
            .and_modify(|h| {
                h.score = health::probe_adjusted(h.score, healthy);
                h.last_probe_healthy = Some(healthy);
            })
            .or_insert_with(|| ModelHealth {
                score: health::probe_adjusted(100, healthy),
                last_probe_healthy: Some(healthy),
            });

        tracing::debug!(tenant = %self.tenant_id, model, healthy, "model probe completed");
        healthy
    }

    /// Probe the primary model, enabling fail-back after quiet periods
    pub async fn probe_primary(&self) -> bool {
        self.probe(&self.config.primary_model).await
    }

    /// Status snapshot; failover history comes from the event sink
    pub(crate) fn status(&self, recent_failovers: Vec<FailoverEvent>) -> ActiveModelStatus {
        let pointer = self.active.lock().unwrap_or_else(PoisonError::into_inner).clone();

        let available_models = self
            .config
            .models()
            .map(|model| {
                let health = self.model_health.get(model).map_or_else(ModelHealth::default, |h| *h);
                ModelStatus {
                    model: model.to_owned(),
                    health_score: health.score,
                    probe_healthy: health.last_probe_healthy,
                }
            })
            .collect();

        ActiveModelStatus {
            active_model: pointer.model,
            version: pointer.version,
            available_models,
            recent_failovers,
        }
    }

    /// Walk the fallback tier after a failed attempt
    async fn fail_over(
        &self,
        failed_model: &str,
        request: &ChatRequest,
        first_error: BackendError,
    ) -> Result<ChatResponse, RouteError> {
        let mut last_error = first_error;

        for candidate in self.config.models() {
            if candidate == failed_model {
                continue;
            }

            if !self.probe(candidate).await || !self.clears_threshold(candidate) {
                self.emit_event(
                    failed_model,
                    candidate,
                    FailoverReason::AutomaticFailover,
                    false,
                    Some("health probe failed".to_owned()),
                );
                continue;
            }

            match self.attempt(candidate, request).await {
                Ok(response) => {
                    self.set_active(candidate);
                    self.emit_event(failed_model, candidate, FailoverReason::AutomaticFailover, true, None);
                    return Ok(response);
                }
                Err(e) if !e.is_retryable() => {
                    self.emit_event(
                        failed_model,
                        candidate,
                        FailoverReason::AutomaticFailover,
                        false,
                        Some(e.to_string()),
                    );
                    return Err(RouteError::InvalidRequest(e.to_string()));
                }
                Err(e) if e.kind() == ErrorKind::Auth => {
                    self.emit_event(
                        failed_model,
                        candidate,
                        FailoverReason::AutomaticFailover,
                        false,
                        Some(e.to_string()),
                    );
                    return Err(RouteError::AllModelsUnavailable {
                        tenant: self.tenant_id.clone(),
                        last_error: e.to_string(),
                    });
                }
                Err(e) => {
                    self.emit_event(
                        failed_model,
                        candidate,
                        FailoverReason::AutomaticFailover,
                        false,
                        Some(e.to_string()),
                    );
                    last_error = e;
                }
            }
        }

        // Candidates exhausted; the active pointer is left unchanged
        Err(RouteError::AllModelsUnavailable {
            tenant: self.tenant_id.clone(),
            last_error: last_error.to_string(),
        })
    }

    /// One attempt against one model, with stats emission
    async fn attempt(&self, model: &str, request: &ChatRequest) -> Result<ChatResponse, BackendError> {
        let req = request.with_model(model);
        let start = Instant::now();

        let result = match tokio::time::timeout(self.per_attempt_timeout, self.backend.chat(&req)).await {
            Ok(r) => r,
            Err(_) => Err(BackendError::Timeout),
        };

        let latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        match &result {
            Ok(_) => self.adjust_score(model, health::success_adjusted),
            Err(e) => {
                let kind = e.kind();
                self.adjust_score(model, |score| health::failure_adjusted(score, kind));
            }
        }

        self.stats.emit(AttemptStat {
            tenant_id: self.tenant_id.clone(),
            target: model.to_owned(),
            latency_ms,
            success: result.is_ok(),
            error_kind: result.as_ref().err().map(BackendError::kind),
            timestamp_unix: health::now_secs(),
        });

        result
    }

    /// Fail back to the primary after a success on a lower tier
    fn maybe_fail_back(&self, current: &str) {
        if !self.config.failback_enabled || current == self.config.primary_model {
            return;
        }

        let primary = &self.config.primary_model;
        let primary_probed_healthy = self
            .model_health
            .get(primary.as_str())
            .is_some_and(|h| h.last_probe_healthy == Some(true));

        if primary_probed_healthy && self.clears_threshold(primary) {
            tracing::info!(
                tenant = %self.tenant_id,
                from = %current,
                to = %primary,
                "primary recovered, failing back"
            );
            self.set_active(primary);
            self.emit_event(
                current,
                primary,
                FailoverReason::AutomaticFailover,
                true,
                Some("primary recovered, failing back".to_owned()),
            );
        }
    }

    fn clears_threshold(&self, model: &str) -> bool {
        let score = self.model_health.get(model).map_or(100, |h| h.score);
        score >= self.config.health_check_threshold
    }

    fn adjust_score(&self, model: &str, adjust: impl Fn(u8) -> u8) {
        self.model_health
            .entry(model.to_owned())
            .and_modify(|h| h.score = adjust(h.score))
            .or_insert_with(|| ModelHealth {
                score: adjust(100),
                last_probe_healthy: None,
            });
    }

    fn set_active(&self, model: &str) {
        let mut pointer = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        pointer.model = model.to_owned();
        pointer.version += 1;
    }

    fn emit_event(
        &self,
        from: &str,
        to: &str,
        reason: FailoverReason,
        success: bool,
        error_message: Option<String>,
    ) {
        self.events.emit(FailoverEvent {
            tenant_id: self.tenant_id.clone(),
            from_model: from.to_owned(),
            to_model: to.to_owned(),
            reason,
            success,
            timestamp_unix: health::now_secs(),
            error_message,
        });
    }
}

impl std::fmt::Debug for ModelFailover {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelFailover")
            .field("tenant_id", &self.tenant_id)
            .field("active", &self.active_model())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use switchboard_config::FailoverTrigger;

    use super::*;
    use crate::events::{EventSink, MemoryEventLog};
    use crate::stats::TracingStatsSink;
    use crate::test_util::{Outcome, ScriptedBackend, multi_model_config};

    struct Fixture {
        controller: ModelFailover,
        backend: Arc<ScriptedBackend>,
        sink: Arc<MemoryEventLog>,
    }

    fn fixture(config: MultiModelConfig) -> Fixture {
        let backend = Arc::new(ScriptedBackend::new("anthropic"));
        let sink = Arc::new(MemoryEventLog::default());
        let controller = ModelFailover::new(
            "acme".to_owned(),
            Arc::clone(&backend) as Arc<dyn Backend>,
            config,
            Duration::from_secs(30),
            EventWriter::spawn(Arc::clone(&sink) as Arc<dyn EventSink>),
            StatsWriter::spawn(Arc::new(TracingStatsSink)),
        );
        Fixture {
            controller,
            backend,
            sink,
        }
    }

    fn request() -> ChatRequest {
        ChatRequest::from_messages(vec![Message::user("hi")])
    }

    async fn drain() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    #[tokio::test]
    async fn dispatch_targets_the_active_model() {
        let fx = fixture(multi_model_config("anthropic", "claude-4-sonnet", &["kimi-k2"]));

        let response = fx.controller.dispatch(&request()).await.unwrap();

        assert_eq!(response.model, "claude-4-sonnet");
        assert_eq!(fx.backend.models_seen(), vec!["claude-4-sonnet"]);
    }

    #[tokio::test]
    async fn failed_primary_fails_over_to_first_healthy_fallback() {
        let fx = fixture(multi_model_config("anthropic", "claude-4-sonnet", &["kimi-k2", "glm-4.5"]));
        fx.backend
            .push_for_model("claude-4-sonnet", Outcome::Fail(BackendError::Upstream("overloaded".to_owned())));

        let response = fx.controller.dispatch(&request()).await.unwrap();
        drain().await;

        assert_eq!(response.model, "kimi-k2");
        assert_eq!(fx.controller.active_model(), "kimi-k2");

        let events = fx.sink.recent("acme", 10).await;
        assert_eq!(events.len(), 1);
        assert!(events[0].success);
        assert_eq!(events[0].reason, FailoverReason::AutomaticFailover);
        assert_eq!(events[0].from_model, "claude-4-sonnet");
        assert_eq!(events[0].to_model, "kimi-k2");
    }

    #[tokio::test]
    async fn manual_trigger_mode_never_fails_over_automatically() {
        let mut config = multi_model_config("anthropic", "claude-4-sonnet", &["kimi-k2"]);
        config.failover_trigger = FailoverTrigger::Manual;
        let fx = fixture(config);
        fx.backend
            .push_for_model("claude-4-sonnet", Outcome::Fail(BackendError::Upstream("overloaded".to_owned())));

        let result = fx.controller.dispatch(&request()).await;

        assert!(matches!(result, Err(RouteError::AllModelsUnavailable { .. })));
        assert_eq!(fx.controller.active_model(), "claude-4-sonnet");
        assert_eq!(fx.backend.calls(), 1);
    }

    #[tokio::test]
    async fn unprobeable_candidate_is_skipped() {
        let fx = fixture(multi_model_config("anthropic", "claude-4-sonnet", &["kimi-k2", "glm-4.5"]));
        fx.backend
            .push_for_model("claude-4-sonnet", Outcome::Fail(BackendError::Upstream("down".to_owned())));
        // kimi's probe fails, glm is fine
        fx.backend
            .push_for_model("kimi-k2", Outcome::Fail(BackendError::Upstream("down".to_owned())));

        let response = fx.controller.dispatch(&request()).await.unwrap();
        drain().await;

        assert_eq!(response.model, "glm-4.5");
        assert_eq!(fx.controller.active_model(), "glm-4.5");

        let events = fx.sink.recent("acme", 10).await;
        assert_eq!(events.len(), 2);
        // Newest first: the successful switch, then the skipped candidate
        assert!(events[0].success);
        assert_eq!(events[0].to_model, "glm-4.5");
        assert!(!events[1].success);
        assert_eq!(events[1].to_model, "kimi-k2");
    }

    #[tokio::test]
    async fn exhausting_every_model_leaves_the_pointer_unchanged() {
        let fx = fixture(multi_model_config("anthropic", "claude-4-sonnet", &["kimi-k2"]));
        fx.backend
            .push_for_model("claude-4-sonnet", Outcome::Fail(BackendError::Upstream("down".to_owned())));
        // Probe succeeds but the real attempt fails
        fx.backend.push_for_model("kimi-k2", Outcome::Succeed);
        fx.backend
            .push_for_model("kimi-k2", Outcome::Fail(BackendError::Upstream("also down".to_owned())));

        let result = fx.controller.dispatch(&request()).await;

        assert!(matches!(result, Err(RouteError::AllModelsUnavailable { .. })));
        assert_eq!(fx.controller.active_model(), "claude-4-sonnet");
    }

    #[tokio::test]
    async fn invalid_request_is_not_retried_across_models() {
        let fx = fixture(multi_model_config("anthropic", "claude-4-sonnet", &["kimi-k2"]));
        fx.backend
            .push_for_model("claude-4-sonnet", Outcome::Fail(BackendError::InvalidRequest("empty".to_owned())));

        let result = fx.controller.dispatch(&request()).await;

        assert!(matches!(result, Err(RouteError::InvalidRequest(_))));
        assert_eq!(fx.backend.calls(), 1);
    }

    #[tokio::test]
    async fn auth_error_is_not_retried_across_models() {
        let fx = fixture(multi_model_config("anthropic", "claude-4-sonnet", &["kimi-k2"]));
        fx.backend
            .push_for_model("claude-4-sonnet", Outcome::Fail(BackendError::Auth("key rejected".to_owned())));

        let result = fx.controller.dispatch(&request()).await;

        assert!(matches!(result, Err(RouteError::AllModelsUnavailable { .. })));
        assert_eq!(fx.backend.calls(), 1);
    }

    #[tokio::test]
    async fn manual_switch_moves_the_pointer_and_bumps_the_version() {
        let fx = fixture(multi_model_config("anthropic", "claude-4-sonnet", &["kimi-k2"]));

        fx.controller.switch_model("kimi-k2", FailoverReason::ManualSwitch).await.unwrap();
        drain().await;

        assert_eq!(fx.controller.active_model(), "kimi-k2");
        let status = fx.controller.status(fx.sink.recent("acme", 10).await);
        assert_eq!(status.version, 1);
        assert_eq!(status.recent_failovers.len(), 1);
        assert_eq!(status.recent_failovers[0].reason, FailoverReason::ManualSwitch);
    }

    #[tokio::test]
    async fn manual_switch_to_unhealthy_target_is_rejected() {
        let fx = fixture(multi_model_config("anthropic", "claude-4-sonnet", &["kimi-k2"]));
        fx.backend
            .push_for_model("kimi-k2", Outcome::Fail(BackendError::Upstream("down".to_owned())));

        let result = fx.controller.switch_model("kimi-k2", FailoverReason::ManualSwitch).await;
        drain().await;

        assert!(matches!(result, Err(RouteError::TargetUnhealthy { .. })));
        assert_eq!(fx.controller.active_model(), "claude-4-sonnet");

        let events = fx.sink.recent("acme", 10).await;
        assert_eq!(events.len(), 1);
        assert!(!events[0].success);
    }

    #[tokio::test]
    async fn manual_switch_to_unconfigured_model_is_rejected() {
        let fx = fixture(multi_model_config("anthropic", "claude-4-sonnet", &["kimi-k2"]));

        let result = fx.controller.switch_model("gpt-oss", FailoverReason::ManualSwitch).await;

        assert!(matches!(result, Err(RouteError::UnknownModel { .. })));
        assert_eq!(fx.backend.calls(), 0);
    }

    #[tokio::test]
    async fn failback_returns_to_the_primary_once_probed_healthy() {
        let mut config = multi_model_config("anthropic", "claude-4-sonnet", &["kimi-k2"]);
        config.failback_enabled = true;
        let fx = fixture(config);

        fx.controller.switch_model("kimi-k2", FailoverReason::Maintenance).await.unwrap();
        assert!(fx.controller.probe_primary().await);

        fx.controller.dispatch(&request()).await.unwrap();
        drain().await;

        assert_eq!(fx.controller.active_model(), "claude-4-sonnet");
        let events = fx.sink.recent("acme", 10).await;
        assert_eq!(events[0].to_model, "claude-4-sonnet");
        assert!(events[0].success);
        assert!(events[0].error_message.as_deref().unwrap_or_default().contains("failing back"));
    }

    #[tokio::test]
    async fn failback_stays_put_without_a_healthy_primary_probe() {
        let mut config = multi_model_config("anthropic", "claude-4-sonnet", &["kimi-k2"]);
        config.failback_enabled = true;
        let fx = fixture(config);

        fx.controller.switch_model("kimi-k2", FailoverReason::Maintenance).await.unwrap();
        // No primary probe has run since the switch
        fx.controller.dispatch(&request()).await.unwrap();

        assert_eq!(fx.controller.active_model(), "kimi-k2");
    }

    #[tokio::test]
    async fn status_reports_all_configured_models() {
        let fx = fixture(multi_model_config("anthropic", "claude-4-sonnet", &["kimi-k2", "glm-4.5"]));
        fx.controller.probe("kimi-k2").await;

        let status = fx.controller.status(Vec::new());

        assert_eq!(status.active_model, "claude-4-sonnet");
        assert_eq!(status.available_models.len(), 3);
        assert_eq!(status.available_models[1].model, "kimi-k2");
        assert_eq!(status.available_models[1].probe_healthy, Some(true));
        assert_eq!(status.available_models[0].probe_healthy, None);
    }
}
