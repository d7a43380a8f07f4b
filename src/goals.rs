//! Goal Store
//!
//! Long-term objective tracking: at most one active goal with progress in
//! [0, 1], and an append-only history of finished goals. Setting a new
//! goal while one is active archives the old one as abandoned rather than
//! discarding it silently.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

/// How a goal left the active slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalOutcome {
    Completed,
    Abandoned,
}

/// A longer-lived objective with progress tracking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Goal {
    pub id: Uuid,
    pub name: String,
    pub priority: f64,
    pub source: String,
    pub progress: f64,
}

/// A goal that has left the active slot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchivedGoal {
    pub goal: Goal,
    pub outcome: GoalOutcome,
    pub archived_at: i64,
}

struct GoalState {
    active: Option<Goal>,
    history: Vec<ArchivedGoal>,
}

/// Minimal state machine: {absent, active}, with archival on exit
pub struct GoalStore {
    state: Mutex<GoalState>,
}

impl GoalStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GoalState { active: None, history: Vec::new() }),
        }
    }

    /// Set the active goal. An already-active goal is archived as
    /// abandoned first.
    pub fn set_goal(&self, name: &str, priority: f64, source: &str) {
        let mut state = self.state.lock();
        if let Some(old) = state.active.take() {
            info!("Goal '{}' abandoned in favor of '{}'", old.name, name);
            state.history.push(ArchivedGoal {
                goal: old,
                outcome: GoalOutcome::Abandoned,
                archived_at: chrono::Utc::now().timestamp(),
            });
        }
        info!("Goal set: {} (priority {:.2}, source {})", name, priority, source);
        state.active = Some(Goal {
            id: Uuid::new_v4(),
            name: name.to_string(),
            priority,
            source: source.to_string(),
            progress: 0.0,
        });
    }

    pub fn active(&self) -> Option<Goal> {
        self.state.lock().active.clone()
    }

    /// Archive the active goal as completed and empty the slot
    pub fn clear_active(&self) {
        let mut state = self.state.lock();
        if let Some(goal) = state.active.take() {
            info!("Goal completed: {}", goal.name);
            state.history.push(ArchivedGoal {
                goal,
                outcome: GoalOutcome::Completed,
                archived_at: chrono::Utc::now().timestamp(),
            });
        }
    }

    /// Add progress; the goal completes and is archived when accumulated
    /// progress reaches 1.0. Returns true if this call completed it.
    pub fn update_progress(&self, amount: f64) -> bool {
        let mut state = self.state.lock();
        let done = match state.active.as_mut() {
            Some(goal) => {
                goal.progress = (goal.progress + amount).min(1.0);
                info!("Goal '{}' progress: {:.0}%", goal.name, goal.progress * 100.0);
                goal.progress >= 1.0
            }
            None => return false,
        };
        if done {
            if let Some(goal) = state.active.take() {
                info!("Goal completed: {}", goal.name);
                state.history.push(ArchivedGoal {
                    goal,
                    outcome: GoalOutcome::Completed,
                    archived_at: chrono::Utc::now().timestamp(),
                });
            }
        }
        done
    }

    /// Goals archived as completed, oldest first
    pub fn completed(&self) -> Vec<Goal> {
        self.state
            .lock()
            .history
            .iter()
            .filter(|a| a.outcome == GoalOutcome::Completed)
            .map(|a| a.goal.clone())
            .collect()
    }

    /// Full archive, oldest first
    pub fn history(&self) -> Vec<ArchivedGoal> {
        self.state.lock().history.clone()
    }
}

impl Default for GoalStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_completes_exactly_once() {
        let store = GoalStore::new();
        store.set_goal("write report", 0.8, "user");

        assert!(!store.update_progress(0.4));
        assert!(!store.update_progress(0.4));
        assert!(store.update_progress(0.4));

        assert!(store.active().is_none());
        let completed = store.completed();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].name, "write report");

        // Further progress on the empty slot does nothing
        assert!(!store.update_progress(1.0));
        assert_eq!(store.completed().len(), 1);
    }

    #[test]
    fn test_replace_archives_old_as_abandoned() {
        let store = GoalStore::new();
        store.set_goal("first", 0.5, "user");
        store.set_goal("second", 0.6, "user");

        assert_eq!(store.active().unwrap().name, "second");
        let history = store.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].goal.name, "first");
        assert_eq!(history[0].outcome, GoalOutcome::Abandoned);
        assert!(store.completed().is_empty());
    }

    #[test]
    fn test_clear_archives_as_completed() {
        let store = GoalStore::new();
        store.set_goal("tidy up", 0.3, "system");
        store.clear_active();
        assert!(store.active().is_none());
        assert_eq!(store.completed().len(), 1);
    }

    #[test]
    fn test_clear_without_active_is_noop() {
        let store = GoalStore::new();
        store.clear_active();
        assert!(store.history().is_empty());
    }
}
