use std::collections::HashMap;

use serde_json::Value;

/// Last-observed argument list per fully-qualified state topic.
///
/// Entries are overwritten on every matching event and never expire or
/// evict; the cache lives only as long as the process.
#[derive(Default)]
pub struct StateCache {
    entries: HashMap<String, Vec<Value>>,
}

impl StateCache {
    pub fn record(&mut self, topic: &str, args: Vec<Value>) {
        self.entries.insert(topic.to_string(), args);
    }

    /// `None` signals the caller to fall back to an authoritative query.
    pub fn get(&self, topic: &str) -> Option<Vec<Value>> {
        self.entries.get(topic).cloned()
    }
}
