use std::collections::HashMap;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::sync::{oneshot, RwLock};
use tracing::{debug, warn};
use uuid::Uuid;

use domo_events::Bus;
use domo_scenario::QueryError;
use domo_topics::{request_topic, Topic};

/// Pairs outgoing `request.*` events with their eventual `reply.*` events
/// by a v4 correlation id.
///
/// Removal from the pending map is the single commit point: the reply path
/// and the timeout path race for it, and exactly one wins. The correlation
/// id travels as the request's only argument and comes back as segment 2
/// of the reply topic.
pub struct Correlator {
    bus: Bus,
    pending: RwLock<HashMap<Uuid, oneshot::Sender<Vec<Value>>>>,
}

impl Correlator {
    pub fn new(bus: Bus) -> Self {
        Self {
            bus,
            pending: RwLock::new(HashMap::new()),
        }
    }

    /// Publish a request and await its reply or the timeout, whichever
    /// comes first. The timeout error names the awaited state.
    pub async fn query(
        &self,
        service: &str,
        device: &str,
        state: &str,
        timeout: Duration,
    ) -> Result<Vec<Value>, QueryError> {
        let correlation = Uuid::new_v4();
        let (tx, mut rx) = oneshot::channel();
        self.pending.write().await.insert(correlation, tx);
        self.bus.publish(
            &request_topic(service, device, state),
            &[json!(correlation.to_string())],
        );

        tokio::select! {
            reply = &mut rx => match reply {
                Ok(args) => Ok(args),
                Err(_) => {
                    self.pending.write().await.remove(&correlation);
                    Err(QueryError::Closed)
                }
            },
            _ = tokio::time::sleep(timeout) => {
                if self.pending.write().await.remove(&correlation).is_some() {
                    Err(QueryError::Timeout {
                        state: state.to_string(),
                    })
                } else {
                    // The reply won the race; its value is already in flight.
                    rx.await.map_err(|_| QueryError::Closed)
                }
            }
        }
    }

    /// Route a `reply.<service>.<correlation>.<state>` event to its waiter.
    /// Late or unmatched replies are dropped.
    pub async fn resolve(&self, topic: &Topic, args: &[Value]) {
        let Some(correlation) = topic
            .segments()
            .get(2)
            .and_then(|segment| Uuid::parse_str(segment).ok())
        else {
            warn!(
                target: "domo::correlator",
                topic = %topic,
                "reply without a parseable correlation id"
            );
            return;
        };
        match self.pending.write().await.remove(&correlation) {
            Some(tx) => {
                let _ = tx.send(args.to_vec());
            }
            None => debug!(
                target: "domo::correlator",
                %correlation,
                "late or unmatched reply dropped"
            ),
        }
    }

    #[cfg(test)]
    pub async fn pending_len(&self) -> usize {
        self.pending.read().await.len()
    }
}
