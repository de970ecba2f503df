use std::time::Duration;

use once_cell::sync::Lazy;

static DEFAULT_BUS_CAPACITY: Lazy<usize> = Lazy::new(|| {
    std::env::var("DOMO_BUS_CAPACITY")
        .ok()
        .and_then(|value| value.trim().parse::<usize>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(256)
});

static DEFAULT_QUERY_TIMEOUT_MS: Lazy<u64> = Lazy::new(|| {
    std::env::var("DOMO_QUERY_TIMEOUT_MS")
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|value| *value >= 10)
        .unwrap_or(5_000)
});

/// Service configuration, resolved from the environment once at startup.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Identity segment used in announcements this service publishes
    /// (`state.<service_id>.<scenario>.active`).
    pub service_id: String,
    pub bus_capacity: usize,
    /// Ceiling for one correlated state query.
    pub query_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            service_id: "scenario".to_string(),
            bus_capacity: *DEFAULT_BUS_CAPACITY,
            query_timeout: Duration::from_millis(*DEFAULT_QUERY_TIMEOUT_MS),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(id) = std::env::var("DOMO_SERVICE_ID") {
            let id = id.trim();
            if !id.is_empty() {
                config.service_id = id.to_string();
            }
        }
        config
    }
}
