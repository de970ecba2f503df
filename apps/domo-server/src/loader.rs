use std::sync::Arc;

use tracing::{info, warn};

use domo_scenario::Scenario;
use domo_topics::{Topic, TopicError};

use crate::service::Service;
use crate::trie::Subscription;

/// A scenario module that cannot be loaded is skipped; the service
/// continues with the rest.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("scenario `{0}` is already loaded")]
    Duplicate(String),
    #[error("scenario `{scenario}` declares handler `{handler}` which it does not implement")]
    UnknownHandler { scenario: String, handler: String },
    #[error("scenario `{scenario}` declares invalid pattern `{pattern}`: {source}")]
    InvalidPattern {
        scenario: String,
        pattern: String,
        source: TopicError,
    },
}

impl Service {
    /// Validate one scenario definition and register its declared
    /// subscriptions. The whole declaration is checked before anything is
    /// registered, so a rejected module leaves no partial state behind.
    pub async fn install_scenario(&self, scenario: Arc<dyn Scenario>) -> Result<(), LoadError> {
        let id = scenario.id().to_string();
        if self.scenarios.read().await.contains_key(&id) {
            return Err(LoadError::Duplicate(id));
        }

        let handler_names = scenario.handler_names();
        let bindings = scenario.bindings();
        let mut patterns = Vec::with_capacity(bindings.len());
        for binding in &bindings {
            if !handler_names.iter().any(|name| *name == binding.handler) {
                return Err(LoadError::UnknownHandler {
                    scenario: id,
                    handler: binding.handler.clone(),
                });
            }
            let pattern =
                Topic::parse(&binding.pattern).map_err(|source| LoadError::InvalidPattern {
                    scenario: id.clone(),
                    pattern: binding.pattern.clone(),
                    source,
                })?;
            patterns.push(pattern);
        }

        {
            let mut trie = self.subscriptions.write().await;
            for (binding, pattern) in bindings.iter().zip(&patterns) {
                trie.register(
                    pattern,
                    Subscription {
                        scenario: id.clone(),
                        handler: binding.handler.clone(),
                    },
                );
            }
        }
        info!(
            target: "domo::loader",
            scenario = %id,
            events = %bindings
                .iter()
                .map(|binding| binding.pattern.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            "register events"
        );
        self.scenarios.write().await.insert(id, scenario);
        Ok(())
    }
}

/// Install every provided definition; a failing module is logged and
/// skipped.
pub async fn load(service: &Arc<Service>, scenarios: Vec<Arc<dyn Scenario>>) {
    for scenario in scenarios {
        let id = scenario.id().to_string();
        if let Err(err) = service.install_scenario(scenario).await {
            warn!(target: "domo::loader", scenario = %id, %err, "scenario not loaded");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::test_support::{FakeScenario, Verdict};
    use domo_events::Bus;
    use domo_scenario::HandlerBinding;

    fn service() -> Arc<Service> {
        Service::new(Bus::new(16), ServerConfig::default())
    }

    fn topic(raw: &str) -> Topic {
        Topic::parse(raw).expect("test topic parses")
    }

    #[tokio::test]
    async fn install_registers_the_declared_bindings() {
        let service = service();
        let scenario = FakeScenario::new("test", "state.test.*.*", Verdict::Start);
        service
            .install_scenario(scenario as Arc<dyn Scenario>)
            .await
            .expect("valid declaration loads");

        let matches = service.matches(&topic("state.test.sensor1.counter")).await;
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].scenario, "test");
        assert_eq!(matches[0].handler, "run_on_event");
        assert!(service.scenario("test").await.is_some());
    }

    #[tokio::test]
    async fn undeclared_handler_rejects_the_module() {
        let service = service();
        let scenario = FakeScenario::with_bindings(
            "test",
            vec![HandlerBinding::new("state.test.*.*", "no_such_handler")],
            Verdict::Start,
        );
        let err = service
            .install_scenario(scenario as Arc<dyn Scenario>)
            .await
            .expect_err("handler name not implemented");
        assert!(matches!(err, LoadError::UnknownHandler { ref handler, .. } if handler == "no_such_handler"));

        assert!(service.matches(&topic("state.test.a.b")).await.is_empty());
        assert!(service.scenario("test").await.is_none());
    }

    #[tokio::test]
    async fn invalid_pattern_rejects_the_module_without_partial_state() {
        let service = service();
        let scenario = FakeScenario::with_bindings(
            "test",
            vec![
                HandlerBinding::new("state.test.*.*", "run_on_event"),
                HandlerBinding::new("state..broken", "run_on_event"),
            ],
            Verdict::Start,
        );
        let err = service
            .install_scenario(scenario as Arc<dyn Scenario>)
            .await
            .expect_err("second pattern is malformed");
        assert!(matches!(err, LoadError::InvalidPattern { .. }));

        // The first, valid binding must not have been registered either.
        assert!(service.matches(&topic("state.test.a.b")).await.is_empty());
        assert!(service.scenario("test").await.is_none());
    }

    #[tokio::test]
    async fn duplicate_scenario_ids_are_rejected() {
        let service = service();
        let first = FakeScenario::new("test", "state.test.*.*", Verdict::Start);
        let second = FakeScenario::new("test", "state.other.*.*", Verdict::Start);

        service
            .install_scenario(first as Arc<dyn Scenario>)
            .await
            .expect("first load succeeds");
        let err = service
            .install_scenario(second as Arc<dyn Scenario>)
            .await
            .expect_err("same id loaded twice");
        assert!(matches!(err, LoadError::Duplicate(ref id) if id == "test"));
    }

    #[tokio::test]
    async fn load_skips_failing_modules_and_keeps_going() {
        let service = service();
        let broken = FakeScenario::with_bindings(
            "broken",
            vec![HandlerBinding::new("state.x.*.*", "missing")],
            Verdict::Start,
        );
        let good = FakeScenario::new("good", "state.good.*.*", Verdict::Start);

        load(
            &service,
            vec![broken as Arc<dyn Scenario>, good as Arc<dyn Scenario>],
        )
        .await;

        assert!(service.scenario("broken").await.is_none());
        assert!(service.scenario("good").await.is_some());
    }
}
