//! Shared fixtures for unit tests

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use switchboard_config::{BackendConfig, FailoverTrigger, MultiModelConfig, TenantConfig};
use switchboard_core::{Backend, BackendError, ChatRequest, ChatResponse, Choice, Usage};

use crate::registry::RouteState;

pub(crate) fn canned_response(model: &str) -> ChatResponse {
    ChatResponse {
        id: "resp-1".to_owned(),
        model: model.to_owned(),
        choices: vec![Choice::text("ok")],
        usage: Usage {
            prompt_tokens: 3,
            completion_tokens: 1,
            total_tokens: 4,
        },
    }
}

/// Adapter that always succeeds (or always reports unhealthy)
pub(crate) struct StubBackend {
    name: String,
    healthy: bool,
}

impl StubBackend {
    pub(crate) fn healthy(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            healthy: true,
        }
    }

    pub(crate) fn unhealthy(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            healthy: false,
        }
    }
}

#[async_trait]
impl Backend for StubBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, BackendError> {
        if self.healthy {
            Ok(canned_response(request.model.as_deref().unwrap_or("default")))
        } else {
            Err(BackendError::Upstream("stub is down".to_owned()))
        }
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }

    async fn validate_credentials(&self) -> bool {
        self.healthy
    }

    fn estimate_cost(&self, usage: &Usage, _model: &str) -> f64 {
        f64::from(usage.total_tokens) * 1e-6
    }
}

/// One scripted chat outcome
pub(crate) enum Outcome {
    Succeed,
    Fail(BackendError),
    /// Never answer within any realistic attempt budget
    Hang,
}

/// Adapter driven by a script of outcomes, optionally keyed by model
///
/// Each `chat` call pops the next outcome scripted for the requested
/// model, falling back to the unkeyed script, falling back to success.
pub(crate) struct ScriptedBackend {
    name: String,
    healthy: AtomicBool,
    outcomes: Mutex<VecDeque<Outcome>>,
    model_outcomes: Mutex<HashMap<String, VecDeque<Outcome>>>,
    calls: AtomicUsize,
    models_seen: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            healthy: AtomicBool::new(true),
            outcomes: Mutex::new(VecDeque::new()),
            model_outcomes: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
            models_seen: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn push(&self, outcome: Outcome) {
        self.outcomes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(outcome);
    }

    pub(crate) fn push_for_model(&self, model: &str, outcome: Outcome) {
        self.model_outcomes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(model.to_owned())
            .or_default()
            .push_back(outcome);
    }

    pub(crate) fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::Relaxed);
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    pub(crate) fn models_seen(&self) -> Vec<String> {
        self.models_seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn next_outcome(&self, model: &str) -> Outcome {
        let scripted = self
            .model_outcomes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(model)
            .and_then(VecDeque::pop_front);
        scripted
            .or_else(|| {
                self.outcomes
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .pop_front()
            })
            .unwrap_or(Outcome::Succeed)
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, BackendError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let model = request.model.clone().unwrap_or_else(|| "default".to_owned());
        self.models_seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(model.clone());

        match self.next_outcome(&model) {
            Outcome::Succeed => Ok(canned_response(&model)),
            Outcome::Fail(error) => Err(error),
            Outcome::Hang => {
                tokio::time::sleep(Duration::from_secs(86_400)).await;
                Err(BackendError::Timeout)
            }
        }
    }

    async fn health_check(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    async fn validate_credentials(&self) -> bool {
        true
    }

    fn estimate_cost(&self, usage: &Usage, _model: &str) -> f64 {
        f64::from(usage.total_tokens) * 1e-6
    }
}

pub(crate) fn stub_route(backend_id: &str, priority: u32) -> RouteState {
    RouteState::new(
        backend_id.to_owned(),
        backend_id.to_owned(),
        priority,
        true,
        Arc::new(StubBackend::healthy(backend_id)),
    )
}

pub(crate) fn unhealthy_route(backend_id: &str, priority: u32) -> RouteState {
    RouteState::new(
        backend_id.to_owned(),
        backend_id.to_owned(),
        priority,
        true,
        Arc::new(StubBackend::unhealthy(backend_id)),
    )
}

pub(crate) fn backend_config(id: &str, priority: u32) -> BackendConfig {
    BackendConfig {
        id: id.to_owned(),
        display_name: None,
        api_key: None,
        base_url: None,
        priority,
        enabled: true,
    }
}

pub(crate) fn tenant_config(backends: &[(&str, u32)]) -> TenantConfig {
    TenantConfig {
        backends: backends
            .iter()
            .map(|(id, priority)| backend_config(id, *priority))
            .collect(),
        multi_model: None,
    }
}

pub(crate) fn stub_adapters(ids: &[&str]) -> HashMap<String, Arc<dyn Backend>> {
    ids.iter()
        .map(|id| {
            (
                (*id).to_owned(),
                Arc::new(StubBackend::healthy(id)) as Arc<dyn Backend>,
            )
        })
        .collect()
}

pub(crate) fn multi_model_config(backend_id: &str, primary: &str, fallbacks: &[&str]) -> MultiModelConfig {
    MultiModelConfig {
        backend_id: backend_id.to_owned(),
        primary_model: primary.to_owned(),
        fallback_models: fallbacks.iter().map(|m| (*m).to_owned()).collect(),
        failover_trigger: FailoverTrigger::Automatic,
        health_check_threshold: 50,
        failback_enabled: false,
    }
}
