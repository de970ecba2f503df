//! Contract between the scenario service and loadable scenario modules.
//!
//! A scenario declares a table of event patterns mapped to named
//! run-condition handlers, validated at load time, plus a constructor that
//! the lifecycle manager invokes when a run-condition decides the scenario
//! should start.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use domo_topics::Topic;

pub type ScenarioId = String;

/// Lifecycle of one scenario identifier.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioState {
    #[default]
    Idle,
    Starting,
    Active,
    Stopping,
}

impl ScenarioState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScenarioState::Idle => "idle",
            ScenarioState::Starting => "starting",
            ScenarioState::Active => "active",
            ScenarioState::Stopping => "stopping",
        }
    }

    pub fn display_label(&self) -> &'static str {
        match self {
            ScenarioState::Idle => "Idle",
            ScenarioState::Starting => "Starting",
            ScenarioState::Active => "Active",
            ScenarioState::Stopping => "Stopping",
        }
    }
}

/// One declared subscription: an event pattern plus the name of the
/// run-condition handler that decides whether the event starts the scenario.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HandlerBinding {
    pub pattern: String,
    pub handler: String,
}

impl HandlerBinding {
    pub fn new(pattern: impl Into<String>, handler: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            handler: handler.into(),
        }
    }
}

/// Identity assigned to a running instance at start. Required to stop it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstanceToken {
    pub instance: Uuid,
    pub scenario: ScenarioId,
}

impl InstanceToken {
    /// A token missing either half of its identity cannot address the
    /// active set; passing one to `stop_scenario` is a programmer error.
    pub fn is_well_formed(&self) -> bool {
        !self.instance.is_nil() && !self.scenario.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("unknown handler `{0}`")]
    UnknownHandler(String),
    #[error("run condition failed: {0}")]
    Condition(String),
    #[error("start failure: {0}")]
    Start(String),
}

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("scenario handle is missing its identity")]
    IncorrectScenario,
    #[error("scenario `{scenario}` is already active")]
    AlreadyActive { scenario: ScenarioId },
    #[error("instance `{instance}` not found in active set")]
    NotActive { instance: Uuid },
    #[error(transparent)]
    Scenario(#[from] ScenarioError),
}

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("timed out waiting for state `{state}`")]
    Timeout { state: String },
    #[error("reply channel closed before a value arrived")]
    Closed,
}

/// Surface the service exposes to scenario code.
#[async_trait]
pub trait ScenarioServices: Send + Sync {
    /// Publish an event through the service onto the bus.
    fn publish(&self, topic: &str, args: &[Value]);

    /// Fetch a named state, from the short-term cache when `use_cache` is
    /// set and the cache holds the topic, otherwise through a correlated
    /// request/reply round trip.
    async fn get_state(
        &self,
        service: &str,
        device: &str,
        state: &str,
        use_cache: bool,
    ) -> Result<Vec<Value>, QueryError>;

    async fn stop_scenario(&self, token: &InstanceToken) -> Result<(), LifecycleError>;

    /// Whether any instance of `scenario` is currently in the active set.
    async fn scenario_active(&self, scenario: &str) -> bool;
}

/// Handed to `Scenario::start`; carries the instance's identity and its
/// handle back into the service.
#[derive(Clone)]
pub struct StartContext {
    pub services: Arc<dyn ScenarioServices>,
    pub token: InstanceToken,
}

/// A loadable scenario definition.
#[async_trait]
pub trait Scenario: Send + Sync {
    fn id(&self) -> &str;

    /// Declared pattern-to-handler table. Validated when the module loads;
    /// every `handler` must appear in [`Scenario::handler_names`].
    fn bindings(&self) -> Vec<HandlerBinding>;

    /// Names of the run-condition handlers this definition implements.
    fn handler_names(&self) -> Vec<&'static str>;

    /// Run-condition check for one matched event: should the scenario start?
    async fn should_start(
        &self,
        handler: &str,
        topic: &Topic,
        args: &[Value],
        services: &dyn ScenarioServices,
    ) -> Result<bool, ScenarioError>;

    /// Instantiate the scenario. Failure leaves it idle.
    async fn start(&self, ctx: StartContext) -> Result<Box<dyn ScenarioInstance>, ScenarioError>;
}

/// A running scenario instance, owned by the active set until stopped.
#[async_trait]
pub trait ScenarioInstance: Send + Sync {
    /// Invoked when the lifecycle manager removes the instance.
    async fn shutdown(&self) {}
}
