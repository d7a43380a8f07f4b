//! Intent Model
//!
//! Short-term focus tracking: at most one intent active at a time, with a
//! priority that is reinforced on success and decayed on failure. Owned by
//! the orchestrator; background workers never touch it.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Where an intent came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentSource {
    System,
    User,
    Autonomy,
}

impl IntentSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Autonomy => "autonomy",
        }
    }
}

/// The engine's current short-term focus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intent {
    pub name: String,
    pub priority: f64,
    pub source: IntentSource,
    pub created_at: i64,
}

/// Minimal state machine: {absent, active}
pub struct IntentModel {
    current: Mutex<Option<Intent>>,
}

impl IntentModel {
    pub fn new() -> Self {
        Self { current: Mutex::new(None) }
    }

    pub fn set_intent(&self, name: &str, priority: f64, source: IntentSource) {
        let intent = Intent {
            name: name.to_string(),
            priority: priority.clamp(0.0, 1.0),
            source,
            created_at: chrono::Utc::now().timestamp(),
        };
        debug!("Intent set: {} (priority {:.2}, {})", intent.name, intent.priority, source.as_str());
        *self.current.lock() = Some(intent);
    }

    pub fn current(&self) -> Option<Intent> {
        self.current.lock().clone()
    }

    pub fn clear_intent(&self) {
        *self.current.lock() = None;
    }

    /// Nudge priority by 0.1 toward 1.0 on success or toward 0.0 on
    /// failure, clamped to [0, 1]. No-op when no intent is active.
    pub fn reinforce(&self, success: bool) {
        let mut guard = self.current.lock();
        if let Some(intent) = guard.as_mut() {
            if success {
                intent.priority = (intent.priority + 0.1).min(1.0);
            } else {
                intent.priority = (intent.priority - 0.1).max(0.0);
            }
        }
    }
}

impl Default for IntentModel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_active_intent() {
        let model = IntentModel::new();
        assert!(model.current().is_none());

        model.set_intent("research", 0.5, IntentSource::User);
        model.set_intent("summarize", 0.7, IntentSource::Autonomy);

        let intent = model.current().unwrap();
        assert_eq!(intent.name, "summarize");

        model.clear_intent();
        assert!(model.current().is_none());
    }

    #[test]
    fn test_reinforce_never_exceeds_one() {
        let model = IntentModel::new();
        model.set_intent("focus", 0.8, IntentSource::System);
        for _ in 0..10 {
            model.reinforce(true);
        }
        assert!((model.current().unwrap().priority - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_reinforce_never_drops_below_zero() {
        let model = IntentModel::new();
        model.set_intent("focus", 0.2, IntentSource::System);
        for _ in 0..10 {
            model.reinforce(false);
        }
        assert!(model.current().unwrap().priority.abs() < f64::EPSILON);
    }

    #[test]
    fn test_reinforce_without_intent_is_noop() {
        let model = IntentModel::new();
        model.reinforce(true);
        assert!(model.current().is_none());
    }

    #[test]
    fn test_priority_clamped_on_set() {
        let model = IntentModel::new();
        model.set_intent("x", 3.5, IntentSource::User);
        assert!((model.current().unwrap().priority - 1.0).abs() < f64::EPSILON);
    }
}
