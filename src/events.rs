//! Event Types
//!
//! Typed, immutable events delivered to the orchestrator by a front-end
//! or by the autonomy loop. Each event is consumed exactly once.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Well-known memory key for the durable event log.
pub const EVENT_LOG_KEY: &str = "events";

/// Well-known memory key for the conversation log.
pub const CONVERSATION_LOG_KEY: &str = "conversations";

/// Discrete event types the orchestrator dispatches over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    SystemBoot,
    SystemShutdown,
    UserInput,
    MemoryWrite,
    MemoryQuery,
    Reflect,
    AutonomyCycle,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SystemBoot => "system_boot",
            Self::SystemShutdown => "system_shutdown",
            Self::UserInput => "user_input",
            Self::MemoryWrite => "memory_write",
            Self::MemoryQuery => "memory_query",
            Self::Reflect => "reflect",
            Self::AutonomyCycle => "autonomy_cycle",
        }
    }
}

/// An immutable event with a JSON payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub event_type: EventType,
    pub payload: Value,
}

impl Event {
    pub fn new(event_type: EventType, payload: Value) -> Self {
        Self { event_type, payload }
    }

    /// Shorthand for a user input event
    pub fn user_input(text: &str) -> Self {
        Self::new(EventType::UserInput, json!({ "text": text }))
    }

    /// Event with no payload
    pub fn bare(event_type: EventType) -> Self {
        Self::new(event_type, Value::Null)
    }

    /// Fetch a string field from the payload
    pub fn payload_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(Value::as_str)
    }
}

/// One row of the durable audit trail stored under [`EVENT_LOG_KEY`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub event: String,
    pub metadata: Value,
    pub task: Value,
    pub result: Value,
    pub timestamp: i64,
}

impl EventLogEntry {
    pub fn new(event: &str, metadata: Value, task: Value, result: Value) -> Self {
        Self {
            event: event.to_string(),
            metadata,
            task,
            result,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_names() {
        assert_eq!(EventType::SystemBoot.as_str(), "system_boot");
        assert_eq!(EventType::AutonomyCycle.as_str(), "autonomy_cycle");
    }

    #[test]
    fn test_user_input_payload() {
        let event = Event::user_input("hello there");
        assert_eq!(event.event_type, EventType::UserInput);
        assert_eq!(event.payload_str("text"), Some("hello there"));
        assert_eq!(event.payload_str("missing"), None);
    }

    #[test]
    fn test_log_entry_roundtrip() {
        let entry = EventLogEntry::new(
            "user_input",
            Value::Null,
            json!({"action": "echo"}),
            Value::Null,
        );
        let value = serde_json::to_value(&entry).unwrap();
        let back: EventLogEntry = serde_json::from_value(value).unwrap();
        assert_eq!(back.event, "user_input");
        assert_eq!(back.task["action"], "echo");
    }
}
