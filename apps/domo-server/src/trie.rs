use std::collections::HashMap;

use domo_scenario::ScenarioId;
use domo_topics::{Topic, WILDCARD};

/// One registered match target: the owning scenario and the name of the
/// run-condition handler to invoke.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Subscription {
    pub scenario: ScenarioId,
    pub handler: String,
}

#[derive(Default)]
struct Node {
    children: HashMap<String, Node>,
    subscriptions: Vec<Subscription>,
}

/// Wildcard registration trie keyed by dot-segmented topic patterns.
///
/// Lookup prefers the exact-segment child and falls back to the `*` child
/// only when the exact segment has no child; the fallback short-circuits
/// per segment rather than merging both branches. Segment counts between
/// pattern and queried topic must match exactly.
#[derive(Default)]
pub struct SubscriptionTrie {
    root: Node,
}

impl SubscriptionTrie {
    pub fn register(&mut self, pattern: &Topic, subscription: Subscription) {
        let mut node = &mut self.root;
        for segment in pattern.segments() {
            node = node.children.entry(segment.clone()).or_default();
        }
        node.subscriptions.push(subscription);
    }

    /// O(depth); an empty result is not an error.
    pub fn lookup(&self, topic: &Topic) -> Vec<Subscription> {
        let mut node = &self.root;
        for segment in topic.segments() {
            node = match node.children.get(segment.as_str()) {
                Some(child) => child,
                None => match node.children.get(WILDCARD) {
                    Some(child) => child,
                    None => return Vec::new(),
                },
            };
        }
        node.subscriptions.clone()
    }
}
