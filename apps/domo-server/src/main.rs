mod config;
mod correlator;
mod dispatch;
mod lifecycle;
mod loader;
mod scenarios;
mod service;
mod state_cache;
mod telemetry;
#[cfg(test)]
mod test_support;
mod trie;

use std::sync::Arc;

use domo_events::Bus;
use domo_scenario::Scenario;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init();
    let config = config::ServerConfig::from_env();
    let bus = Bus::new(config.bus_capacity);
    let service = service::Service::new(bus, config);

    let mut definitions: Vec<Arc<dyn Scenario>> = Vec::new();
    if std::env::var("DOMO_DEMO_SCENARIO").ok().as_deref() == Some("1") {
        definitions.push(scenarios::demo());
    }
    loader::load(&service, definitions).await;

    let listener = dispatch::start(service.clone());
    info!("scenario service started");

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    listener.abort();
    Ok(())
}
