use std::sync::Arc;

use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use domo_scenario::{
    InstanceToken, LifecycleError, Scenario, ScenarioServices, ScenarioState, StartContext,
};
use domo_topics::scenario_active_topic;

use crate::service::{ActiveScenario, Service};

impl Service {
    /// Start a scenario: instantiate it, admit it to the active set and
    /// announce the transition. Starts serialize on `start_lock`, so
    /// concurrent start signals for one scenario id cannot both pass the
    /// already-active check.
    pub(crate) async fn start_scenario(
        self: &Arc<Self>,
        scenario: Arc<dyn Scenario>,
    ) -> Result<InstanceToken, LifecycleError> {
        let id = scenario.id().to_string();
        let _admission = self.start_lock.lock().await;
        if self.scenario_active(&id).await {
            return Err(LifecycleError::AlreadyActive { scenario: id });
        }

        let token = InstanceToken {
            instance: Uuid::new_v4(),
            scenario: id.clone(),
        };
        info!(
            target: "domo::lifecycle",
            scenario = %id,
            instance = %token.instance,
            state = ScenarioState::Starting.as_str(),
            "starting scenario"
        );
        let ctx = StartContext {
            services: Arc::clone(self) as Arc<dyn ScenarioServices>,
            token: token.clone(),
        };
        let handle = match scenario.start(ctx).await {
            Ok(handle) => handle,
            Err(err) => {
                warn!(
                    target: "domo::lifecycle",
                    scenario = %id,
                    %err,
                    "scenario failed to start, staying idle"
                );
                return Err(LifecycleError::Scenario(err));
            }
        };

        self.active.write().await.insert(
            token.instance,
            ActiveScenario {
                token: token.clone(),
                handle,
            },
        );
        self.bus().publish(
            &scenario_active_topic(&self.config().service_id, &id),
            &[json!(true)],
        );
        info!(
            target: "domo::lifecycle",
            scenario = %id,
            instance = %token.instance,
            state = ScenarioState::Active.as_str(),
            "scenario active"
        );
        Ok(token)
    }

    /// Stop a running instance: remove it from the active set, shut it
    /// down and announce the inverse transition. A token that never made
    /// it into the set is a reported error, not a silent no-op.
    pub(crate) async fn remove_active(&self, token: &InstanceToken) -> Result<(), LifecycleError> {
        if !token.is_well_formed() {
            return Err(LifecycleError::IncorrectScenario);
        }
        let Some(entry) = self.active.write().await.remove(&token.instance) else {
            return Err(LifecycleError::NotActive {
                instance: token.instance,
            });
        };
        info!(
            target: "domo::lifecycle",
            scenario = %entry.token.scenario,
            instance = %token.instance,
            state = ScenarioState::Stopping.as_str(),
            "stopping scenario"
        );
        entry.handle.shutdown().await;
        self.bus().publish(
            &scenario_active_topic(&self.config().service_id, &entry.token.scenario),
            &[json!(false)],
        );
        info!(
            target: "domo::lifecycle",
            scenario = %entry.token.scenario,
            instance = %token.instance,
            state = ScenarioState::Idle.as_str(),
            "scenario stopped"
        );
        Ok(())
    }
}
