use std::sync::Arc;

use serde_json::Value;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use domo_events::Envelope;
use domo_scenario::{LifecycleError, Scenario, ScenarioServices};
use domo_topics::Topic;

use crate::service::Service;
use crate::trie::Subscription;

/// Spawn the bus listener. Events flow through the dispatcher in
/// delivery order; the per-event fan-out is fire-and-forget.
pub(crate) fn start(service: Arc<Service>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut rx = service.bus().subscribe();
        loop {
            match rx.recv().await {
                Ok(env) => {
                    let _ = dispatch_event(&service, env).await;
                }
                Err(RecvError::Lagged(missed)) => {
                    warn!(target: "domo::dispatch", missed, "event listener lagged, events dropped");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

/// Dispatch one event: update the state cache, route replies to the
/// correlator, then fan out over the matched subscriptions. Returns the
/// spawned match tasks so tests have a join point; the listener drops
/// them.
pub(crate) async fn dispatch_event(service: &Arc<Service>, env: Envelope) -> Vec<JoinHandle<()>> {
    let topic = match Topic::parse(&env.topic) {
        Ok(topic) => topic,
        Err(err) => {
            warn!(target: "domo::dispatch", topic = %env.topic, %err, "skipping malformed topic");
            return Vec::new();
        }
    };

    if topic.is_state() {
        service.record_state(&env.topic, env.args.clone()).await;
    } else if topic.is_reply() {
        service.correlator().resolve(&topic, &env.args).await;
    }

    let matches = service.matches(&topic).await;
    let mut handles = Vec::with_capacity(matches.len());
    for subscription in matches {
        let Some(scenario) = service.scenario(&subscription.scenario).await else {
            warn!(
                target: "domo::dispatch",
                scenario = %subscription.scenario,
                "matched subscription without a loaded scenario"
            );
            continue;
        };
        let service = Arc::clone(service);
        let topic = topic.clone();
        let args = env.args.clone();
        handles.push(tokio::spawn(async move {
            run_match(service, scenario, subscription, topic, args).await;
        }));
    }
    handles
}

/// Evaluate one matched subscription's run condition and act on the
/// verdict. A failing handler only loses its own match.
async fn run_match(
    service: Arc<Service>,
    scenario: Arc<dyn Scenario>,
    subscription: Subscription,
    topic: Topic,
    args: Vec<Value>,
) {
    let services: &dyn ScenarioServices = service.as_ref();
    match scenario
        .should_start(&subscription.handler, &topic, &args, services)
        .await
    {
        Err(err) => warn!(
            target: "domo::dispatch",
            scenario = %subscription.scenario,
            handler = %subscription.handler,
            %err,
            "run condition failed, match skipped"
        ),
        Ok(false) => {}
        Ok(true) => match service.start_scenario(scenario).await {
            Ok(token) => debug!(
                target: "domo::dispatch",
                scenario = %subscription.scenario,
                instance = %token.instance,
                "scenario started by event"
            ),
            Err(LifecycleError::AlreadyActive { scenario }) => debug!(
                target: "domo::dispatch",
                %scenario,
                "start suppressed, already active"
            ),
            Err(err) => warn!(
                target: "domo::dispatch",
                scenario = %subscription.scenario,
                %err,
                "scenario start failed"
            ),
        },
    }
}
