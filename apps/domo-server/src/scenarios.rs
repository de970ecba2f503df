//! Built-in demo scenario, enabled with `DOMO_DEMO_SCENARIO=1`.
//!
//! Mirrors the classic smoke-test automation: start when a
//! `state.demo.*.*` event fires, the scenario is not already running and
//! the UPS reports mains power; log a heartbeat every second; stop itself
//! after one minute.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use domo_scenario::{
    HandlerBinding, Scenario, ScenarioError, ScenarioInstance, ScenarioServices, StartContext,
};
use domo_topics::Topic;

const RUN_ON_EVENT: &str = "run_on_event";
const RUN_FOR: Duration = Duration::from_secs(60);
const HEARTBEAT: Duration = Duration::from_secs(1);

pub(crate) fn demo() -> Arc<dyn Scenario> {
    Arc::new(DemoScenario)
}

struct DemoScenario;

/// JavaScript-style truthiness; the upstream state services publish a mix
/// of booleans, numbers and strings for the same flag.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().map(|n| n != 0.0).unwrap_or(true),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[async_trait]
impl Scenario for DemoScenario {
    fn id(&self) -> &str {
        "demo"
    }

    fn bindings(&self) -> Vec<HandlerBinding> {
        vec![HandlerBinding::new("state.demo.*.*", RUN_ON_EVENT)]
    }

    fn handler_names(&self) -> Vec<&'static str> {
        vec![RUN_ON_EVENT]
    }

    async fn should_start(
        &self,
        handler: &str,
        _topic: &Topic,
        _args: &[Value],
        services: &dyn ScenarioServices,
    ) -> Result<bool, ScenarioError> {
        if handler != RUN_ON_EVENT {
            return Err(ScenarioError::UnknownHandler(handler.to_string()));
        }
        if services.scenario_active(self.id()).await {
            return Ok(false);
        }
        let power = services
            .get_state("ups", "raspberry", "power", true)
            .await
            .map_err(|err| ScenarioError::Condition(err.to_string()))?;
        Ok(power.first().map(truthy).unwrap_or(false))
    }

    async fn start(&self, ctx: StartContext) -> Result<Box<dyn ScenarioInstance>, ScenarioError> {
        let cancel = CancellationToken::new();

        let heartbeat = cancel.clone();
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(HEARTBEAT);
            loop {
                tokio::select! {
                    _ = heartbeat.cancelled() => break,
                    _ = tick.tick() => info!(target: "domo::demo", "demo scenario running"),
                }
            }
        });

        let deadline = cancel.clone();
        let services = Arc::clone(&ctx.services);
        let token = ctx.token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = deadline.cancelled() => {}
                _ = tokio::time::sleep(RUN_FOR) => {
                    if let Err(err) = services.stop_scenario(&token).await {
                        warn!(target: "domo::demo", %err, "demo auto-stop failed");
                    }
                }
            }
        });

        Ok(Box::new(DemoInstance { cancel }))
    }
}

struct DemoInstance {
    cancel: CancellationToken,
}

#[async_trait]
impl ScenarioInstance for DemoInstance {
    async fn shutdown(&self) {
        self.cancel.cancel();
    }
}
