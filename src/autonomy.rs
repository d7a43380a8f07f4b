//! Autonomy Loop
//!
//! Bounded reflect → reason → act cycle. Each cycle inspects the recent
//! event log for failure patterns, consults intent and goal state for at
//! most one proposed action, and dispatches it through the orchestrator,
//! reinforcing intent on success. The loop exits when the liveness flag
//! drops or the cycle cap is reached; a failed cycle is logged and the
//! loop moves on.

use crate::intent::IntentSource;
use crate::orchestrator::Orchestrator;
use crate::skills::TaskSpec;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Scan the most recent `window` event-log entries and produce insight
/// strings for actions that failed repeatedly. Pure read.
pub fn analyze_failures(events: &Value, window: usize) -> Vec<String> {
    let entries = match events.as_array() {
        Some(arr) => arr,
        None => return vec![],
    };

    let mut failures: HashMap<String, usize> = HashMap::new();
    let start = entries.len().saturating_sub(window);
    for entry in &entries[start..] {
        let failed = entry
            .get("result")
            .and_then(|r| r.get("status"))
            .and_then(Value::as_str)
            .map(|s| s == "fail")
            .unwrap_or(false);
        if failed {
            let action = entry
                .get("task")
                .and_then(|t| t.get("action"))
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string();
            *failures.entry(action).or_insert(0) += 1;
        }
    }

    failures
        .into_iter()
        .filter(|(_, count)| *count >= 2)
        .map(|(action, count)| format!("action '{action}' failed {count} times recently"))
        .collect()
}

pub struct AutonomyLoop {
    orch: Arc<Orchestrator>,
    max_cycles: u32,
    cycle_delay: Duration,
    cycles: AtomicU32,
}

impl AutonomyLoop {
    pub fn new(orch: Arc<Orchestrator>, max_cycles: u32) -> Self {
        Self {
            orch,
            max_cycles,
            cycle_delay: Duration::ZERO,
            cycles: AtomicU32::new(0),
        }
    }

    /// Rate-limit cycles with a fixed delay
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.cycle_delay = delay;
        self
    }

    pub fn cycles_completed(&self) -> u32 {
        self.cycles.load(Ordering::Relaxed)
    }

    /// Run until the liveness flag drops or the cycle cap is reached
    pub async fn run(&self) {
        info!("Autonomy loop starting (cap {} cycles)", self.max_cycles);
        while self.orch.is_alive() && self.cycles.load(Ordering::Relaxed) < self.max_cycles {
            let cycle = self.cycles.fetch_add(1, Ordering::Relaxed) + 1;
            debug!("Autonomy cycle {}", cycle);

            self.run_cycle(cycle).await;

            if !self.cycle_delay.is_zero() {
                tokio::time::sleep(self.cycle_delay).await;
            }
        }
        info!(
            "Autonomy loop finished after {} cycles",
            self.cycles.load(Ordering::Relaxed)
        );
    }

    /// One reflect → reason → act pass
    pub async fn run_cycle(&self, cycle: u32) {
        // Reflect: pure read over the recent event log
        let insights = self.orch.reflect();
        if !insights.is_empty() {
            debug!("Reflection found {} issues", insights.len());
        }

        // Reason: at most one proposal
        let proposal = match self.reason() {
            Some(p) => p,
            None => return,
        };

        // Act: dispatch and reinforce; a failure never ends the loop
        let outcome = self
            .orch
            .dispatch_with_meta(&proposal, json!({ "cycle": cycle, "autonomous": true }))
            .await;
        if !outcome.is_done() {
            warn!("Autonomous action '{}' did not complete: {}", proposal.action, outcome.result_text());
        }
        self.orch.intent().reinforce(outcome.is_done());
    }

    /// Produce the next action from current intent and goal state
    fn reason(&self) -> Option<TaskSpec> {
        let intent = self.orch.intent().current();
        let goal = self.orch.goals().active();

        let intent = match intent {
            Some(i) => i,
            None => {
                self.orch
                    .intent()
                    .set_intent("initialize_system", 0.9, IntentSource::Autonomy);
                debug!("No intent; seeding initial intent and greeting");
                return Some(TaskSpec::new("greet", json!({ "name": "there" })));
            }
        };

        if let Some(goal) = goal {
            if goal.progress >= 1.0 {
                debug!("Goal '{}' satisfied; clearing", goal.name);
                self.orch.goals().clear_active();
                self.orch.intent().clear_intent();
                return None;
            }
            return Some(TaskSpec::with_text(
                "echo",
                &format!("Working towards goal: {}", goal.name),
            ));
        }

        Some(TaskSpec::with_text(
            "echo",
            &format!("Maintaining intent '{}'", intent.name),
        ))
    }

    pub fn status(&self) -> Value {
        json!({
            "cycles_completed": self.cycles_completed(),
            "alive": self.orch.is_alive(),
            "memory_events": self.orch.memory_summary()["total_events"],
            "current_intent": self.orch.intent().current().map(|i| i.name),
            "active_goal": self.orch.goals().active().map(|g| g.name),
        })
    }
}
