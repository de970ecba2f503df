//! Dot-segmented event topics shared across the scenario service.
//!
//! Topics name a category of occurrence on the bus (`state.ups.raspberry.power`).
//! The literal segment `*` matches exactly one segment, and only when it
//! appears in a registered pattern; published topics always match literally.

use std::fmt;
use std::str::FromStr;

/// Wildcard segment, legal in registered patterns only.
pub const WILDCARD: &str = "*";

/// First segment of a state announcement.
pub const SEG_STATE: &str = "state";
/// First segment of an authoritative state request.
pub const SEG_REQUEST: &str = "request";
/// First segment of a correlated reply.
pub const SEG_REPLY: &str = "reply";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TopicError {
    #[error("topic is empty")]
    Empty,
    #[error("topic `{0}` contains an empty segment")]
    EmptySegment(String),
}

/// An ordered sequence of non-empty string segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Topic {
    segments: Vec<String>,
}

impl Topic {
    pub fn parse(raw: &str) -> Result<Self, TopicError> {
        if raw.is_empty() {
            return Err(TopicError::Empty);
        }
        let segments: Vec<String> = raw.split('.').map(str::to_string).collect();
        if segments.iter().any(|segment| segment.is_empty()) {
            return Err(TopicError::EmptySegment(raw.to_string()));
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// True for `state.*` announcements, the only events the cache records.
    pub fn is_state(&self) -> bool {
        self.segments[0] == SEG_STATE
    }

    pub fn is_request(&self) -> bool {
        self.segments[0] == SEG_REQUEST
    }

    pub fn is_reply(&self) -> bool {
        self.segments[0] == SEG_REPLY
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

impl FromStr for Topic {
    type Err = TopicError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Topic::parse(raw)
    }
}

/// `state.<service>.<device>.<state>`
pub fn state_topic(service: &str, device: &str, state: &str) -> String {
    format!("{SEG_STATE}.{service}.{device}.{state}")
}

/// `request.<service>.<device>.<state>`
pub fn request_topic(service: &str, device: &str, state: &str) -> String {
    format!("{SEG_REQUEST}.{service}.{device}.{state}")
}

/// `reply.<service>.<correlation>.<state>`
pub fn reply_topic(service: &str, correlation: &str, state: &str) -> String {
    format!("{SEG_REPLY}.{service}.{correlation}.{state}")
}

/// Announcement topic for a scenario's active flag.
pub fn scenario_active_topic(service_id: &str, scenario: &str) -> String {
    format!("{SEG_STATE}.{service_id}.{scenario}.active")
}
