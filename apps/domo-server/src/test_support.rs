use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use domo_scenario::{
    HandlerBinding, Scenario, ScenarioError, ScenarioInstance, ScenarioServices, StartContext,
};
use domo_topics::Topic;

/// What the scripted run condition answers.
pub(crate) enum Verdict {
    Start,
    Ignore,
    Fail,
}

/// Scripted scenario definition used across the server tests: fixed
/// bindings, a programmable verdict and countable calls.
pub(crate) struct FakeScenario {
    id: String,
    bindings: Vec<HandlerBinding>,
    verdict: Verdict,
    fail_start: bool,
    pub(crate) condition_calls: AtomicUsize,
    pub(crate) seen: Mutex<Vec<(String, Vec<Value>)>>,
    pub(crate) started: AtomicUsize,
    pub(crate) shutdowns: Arc<AtomicUsize>,
}

impl FakeScenario {
    pub(crate) fn new(id: &str, pattern: &str, verdict: Verdict) -> Arc<Self> {
        Self::with_bindings(
            id,
            vec![HandlerBinding::new(pattern, "run_on_event")],
            verdict,
        )
    }

    pub(crate) fn with_bindings(
        id: &str,
        bindings: Vec<HandlerBinding>,
        verdict: Verdict,
    ) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            bindings,
            verdict,
            fail_start: false,
            condition_calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
            started: AtomicUsize::new(0),
            shutdowns: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub(crate) fn failing_start(id: &str, pattern: &str) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            bindings: vec![HandlerBinding::new(pattern, "run_on_event")],
            verdict: Verdict::Start,
            fail_start: true,
            condition_calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
            started: AtomicUsize::new(0),
            shutdowns: Arc::new(AtomicUsize::new(0)),
        })
    }
}

#[async_trait]
impl Scenario for FakeScenario {
    fn id(&self) -> &str {
        &self.id
    }

    fn bindings(&self) -> Vec<HandlerBinding> {
        self.bindings.clone()
    }

    fn handler_names(&self) -> Vec<&'static str> {
        vec!["run_on_event"]
    }

    async fn should_start(
        &self,
        handler: &str,
        topic: &Topic,
        args: &[Value],
        _services: &dyn ScenarioServices,
    ) -> Result<bool, ScenarioError> {
        if handler != "run_on_event" {
            return Err(ScenarioError::UnknownHandler(handler.to_string()));
        }
        self.condition_calls.fetch_add(1, Ordering::SeqCst);
        self.seen
            .lock()
            .await
            .push((topic.to_string(), args.to_vec()));
        match self.verdict {
            Verdict::Start => Ok(true),
            Verdict::Ignore => Ok(false),
            Verdict::Fail => Err(ScenarioError::Condition("scripted failure".to_string())),
        }
    }

    async fn start(&self, _ctx: StartContext) -> Result<Box<dyn ScenarioInstance>, ScenarioError> {
        if self.fail_start {
            return Err(ScenarioError::Start("scripted launch failure".to_string()));
        }
        self.started.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeInstance {
            shutdowns: Arc::clone(&self.shutdowns),
        }))
    }
}

struct FakeInstance {
    shutdowns: Arc<AtomicUsize>,
}

#[async_trait]
impl ScenarioInstance for FakeInstance {
    async fn shutdown(&self) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}
