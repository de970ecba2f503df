use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use domo_events::Bus;
use domo_scenario::{
    InstanceToken, LifecycleError, QueryError, Scenario, ScenarioId, ScenarioInstance,
    ScenarioServices,
};
use domo_topics::{state_topic, Topic};

use crate::config::ServerConfig;
use crate::correlator::Correlator;
use crate::state_cache::StateCache;
use crate::trie::{Subscription, SubscriptionTrie};

/// One entry in the active set.
pub(crate) struct ActiveScenario {
    pub(crate) token: InstanceToken,
    pub(crate) handle: Box<dyn ScenarioInstance>,
}

/// Shared state of the scenario service: the subscription trie, the state
/// cache, the correlator, the loaded definitions and the active set. Each
/// structure is guarded by its own lock; starts additionally serialize on
/// `start_lock` (single-writer discipline for active-set admission).
pub struct Service {
    bus: Bus,
    config: ServerConfig,
    correlator: Correlator,
    pub(crate) subscriptions: RwLock<SubscriptionTrie>,
    pub(crate) cache: RwLock<StateCache>,
    pub(crate) scenarios: RwLock<HashMap<ScenarioId, Arc<dyn Scenario>>>,
    pub(crate) active: RwLock<HashMap<Uuid, ActiveScenario>>,
    pub(crate) start_lock: Mutex<()>,
}

impl Service {
    pub fn new(bus: Bus, config: ServerConfig) -> Arc<Self> {
        Arc::new(Self {
            correlator: Correlator::new(bus.clone()),
            bus,
            config,
            subscriptions: RwLock::new(SubscriptionTrie::default()),
            cache: RwLock::new(StateCache::default()),
            scenarios: RwLock::new(HashMap::new()),
            active: RwLock::new(HashMap::new()),
            start_lock: Mutex::new(()),
        })
    }

    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    pub(crate) fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub(crate) fn correlator(&self) -> &Correlator {
        &self.correlator
    }

    pub(crate) async fn record_state(&self, topic: &str, args: Vec<Value>) {
        self.cache.write().await.record(topic, args);
    }

    pub(crate) async fn matches(&self, topic: &Topic) -> Vec<Subscription> {
        self.subscriptions.read().await.lookup(topic)
    }

    pub(crate) async fn scenario(&self, id: &str) -> Option<Arc<dyn Scenario>> {
        self.scenarios.read().await.get(id).cloned()
    }
}

#[async_trait]
impl ScenarioServices for Service {
    fn publish(&self, topic: &str, args: &[Value]) {
        self.bus.publish(topic, args);
    }

    async fn get_state(
        &self,
        service: &str,
        device: &str,
        state: &str,
        use_cache: bool,
    ) -> Result<Vec<Value>, QueryError> {
        if use_cache {
            if let Some(args) = self.cache.read().await.get(&state_topic(service, device, state)) {
                return Ok(args);
            }
        }
        self.correlator
            .query(service, device, state, self.config.query_timeout)
            .await
    }

    async fn stop_scenario(&self, token: &InstanceToken) -> Result<(), LifecycleError> {
        self.remove_active(token).await
    }

    async fn scenario_active(&self, scenario: &str) -> bool {
        self.active
            .read()
            .await
            .values()
            .any(|entry| entry.token.scenario == scenario)
    }
}
