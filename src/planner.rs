//! Goal Planner
//!
//! Expands a goal name into an ordered list of skill invocations. Plans
//! can be defined at runtime; a couple of fixed plans ship by default and
//! anything unknown falls back to a single echo step so `execute_goal`
//! always has something to run.

use crate::skills::TaskSpec;
use parking_lot::Mutex;
use serde_json::json;
use std::collections::HashMap;

pub struct Planner {
    plans: Mutex<HashMap<String, Vec<TaskSpec>>>,
}

impl Planner {
    pub fn new() -> Self {
        let mut plans = HashMap::new();
        plans.insert(
            "learn me".to_string(),
            vec![
                TaskSpec::new("greet", json!({ "name": "there" })),
                TaskSpec::with_text("echo", "Starting your learning session!"),
                TaskSpec::with_text("memory.write", "Learning session started"),
            ],
        );
        plans.insert(
            "focus on memory".to_string(),
            vec![TaskSpec::new("memory.recall", json!({ "query": "" }))],
        );
        Self { plans: Mutex::new(plans) }
    }

    /// Define (or replace) the step list for a goal name
    pub fn define(&self, goal_name: &str, steps: Vec<TaskSpec>) {
        self.plans.lock().insert(goal_name.to_lowercase(), steps);
    }

    /// Ordered task list for a goal. Steps execute strictly in order;
    /// failure handling is the dispatcher's concern, not the planner's.
    pub fn plan_for_goal(&self, goal_name: &str) -> Vec<TaskSpec> {
        let key = goal_name.to_lowercase();
        if let Some(steps) = self.plans.lock().get(&key) {
            return steps.clone();
        }
        vec![TaskSpec::with_text("echo", &format!("Executing goal: {key}"))]
    }
}

impl Default for Planner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_goal_expands_to_steps() {
        let planner = Planner::new();
        let tasks = planner.plan_for_goal("learn me");
        assert_eq!(tasks.len(), 3);
        assert_eq!(tasks[0].action, "greet");
        assert_eq!(tasks[2].action, "memory.write");
    }

    #[test]
    fn test_unknown_goal_falls_back_to_echo() {
        let planner = Planner::new();
        let tasks = planner.plan_for_goal("conquer entropy");
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].action, "echo");
        assert!(tasks[0].param_str("text").unwrap().contains("conquer entropy"));
    }

    #[test]
    fn test_defined_plan_overrides_fallback() {
        let planner = Planner::new();
        planner.define(
            "tidy desk",
            vec![TaskSpec::with_text("echo", "one"), TaskSpec::with_text("echo", "two")],
        );
        assert_eq!(planner.plan_for_goal("Tidy Desk").len(), 2);
    }

    #[test]
    fn test_goal_name_case_insensitive() {
        let planner = Planner::new();
        assert_eq!(planner.plan_for_goal("LEARN ME").len(), 3);
    }
}
