//! Scriptable backend adapter for integration tests
//!
//! Stands in for a real provider adapter: returns canned responses,
//! can be told to fail the first `n` calls, to fail specific models,
//! or to hang past any attempt timeout.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use switchboard_core::{Backend, BackendError, ChatRequest, ChatResponse, Choice, Usage};

pub struct MockBackend {
    name: String,
    healthy: AtomicBool,
    hang: AtomicBool,
    fail_first: AtomicU32,
    failing_models: Mutex<HashSet<String>>,
    calls: AtomicU32,
}

impl MockBackend {
    /// A backend that always answers
    pub fn ok(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_owned(),
            healthy: AtomicBool::new(true),
            hang: AtomicBool::new(false),
            fail_first: AtomicU32::new(0),
            failing_models: Mutex::new(HashSet::new()),
            calls: AtomicU32::new(0),
        })
    }

    /// A backend that fails its first `n` calls with an upstream error
    pub fn failing(name: &str, n: u32) -> Arc<Self> {
        let backend = Self::ok(name);
        backend.fail_first.store(n, Ordering::Relaxed);
        backend
    }

    /// A backend whose calls never complete within any attempt budget
    pub fn timing_out(name: &str) -> Arc<Self> {
        let backend = Self::ok(name);
        backend.hang.store(true, Ordering::Relaxed);
        backend
    }

    /// Make every call for `model` fail from now on
    pub fn fail_model(&self, model: &str) {
        self.failing_models
            .lock()
            .expect("lock poisoned")
            .insert(model.to_owned());
    }

    /// Let `model` succeed again
    pub fn recover_model(&self, model: &str) {
        self.failing_models.lock().expect("lock poisoned").remove(model);
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::Relaxed);
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Backend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, BackendError> {
        self.calls.fetch_add(1, Ordering::Relaxed);

        if self.hang.load(Ordering::Relaxed) {
            tokio::time::sleep(Duration::from_secs(86_400)).await;
            return Err(BackendError::Timeout);
        }

        let model = request.model.clone().unwrap_or_else(|| "mock-model".to_owned());
        if self.failing_models.lock().expect("lock poisoned").contains(&model) {
            return Err(BackendError::Upstream(format!("model '{model}' unavailable")));
        }

        if self
            .fail_first
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(BackendError::Upstream("mock backend failure".to_owned()));
        }

        Ok(ChatResponse {
            id: format!("{}-resp", self.name),
            model,
            choices: vec![Choice::text(format!("hello from {}", self.name))],
            usage: Usage {
                prompt_tokens: 5,
                completion_tokens: 3,
                total_tokens: 8,
            },
        })
    }

    async fn health_check(&self) -> bool {
        self.healthy.load(Ordering::Relaxed) && !self.hang.load(Ordering::Relaxed)
    }

    async fn validate_credentials(&self) -> bool {
        true
    }

    fn estimate_cost(&self, usage: &Usage, _model: &str) -> f64 {
        f64::from(usage.total_tokens) * 2e-6
    }
}
