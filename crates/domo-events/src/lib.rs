use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;

/// Minimal event envelope (RFC3339 time). `args` is the ordered list of
/// argument values the event carries.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Envelope {
    pub time: String,
    pub topic: String,
    pub args: Vec<Value>,
}

/// A simple broadcast bus for dot-segmented topic events. Process-local
/// stand-in for the network bus collaborator.
#[derive(Clone)]
pub struct Bus {
    tx: broadcast::Sender<Envelope>,
}

impl Bus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.tx.subscribe()
    }

    pub fn publish(&self, topic: &str, args: &[Value]) {
        let now = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
        let _ = self.tx.send(Envelope {
            time: now,
            topic: topic.to_string(),
            args: args.to_vec(),
        });
    }
}
