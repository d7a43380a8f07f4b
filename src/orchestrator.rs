//! Orchestrator
//!
//! Central dispatcher over typed events: override commands get first
//! refusal, then registered skills, then the completion-service fallback.
//! Every dispatched action and fallback completion is committed to the
//! durable event log. Intent and goal state live here and are never
//! mutated by background workers; they reach the engine only through the
//! shared memory store.

use crate::autonomy::analyze_failures;
use crate::commands::{parse_override, OverrideCommand};
use crate::completion::{ChatMessage, CompletionClient};
use crate::config::EngineConfig;
use crate::events::{Event, EventLogEntry, EventType, CONVERSATION_LOG_KEY, EVENT_LOG_KEY};
use crate::goals::GoalStore;
use crate::intent::{IntentModel, IntentSource};
use crate::memory::MemoryStore;
use crate::planner::Planner;
use crate::prompt_adapt::PromptAdapter;
use crate::skills::{Outcome, SkillContext, SkillLearner, SkillRegistry, TaskSpec};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Phrases answered directly from the engine's self-concept
const IDENTITY_TRIGGERS: &[&str] = &[
    "who are you",
    "what is your name",
    "tell me about yourself",
    "your identity",
    "who you are",
];

/// Words that mark a turn as expressing a preference worth keeping
const PREFERENCE_CUES: &[&str] = &["like", "prefer", "love", "hate", "dislike"];

pub struct Orchestrator {
    memory: Arc<MemoryStore>,
    skills: Arc<SkillRegistry>,
    completion: Arc<CompletionClient>,
    intent: IntentModel,
    goals: GoalStore,
    planner: Planner,
    prompt: PromptAdapter,
    learner: SkillLearner,
    /// Liveness flag; the sole stop signal for the autonomy loop
    alive: AtomicBool,
    self_concept: String,
}

impl Orchestrator {
    pub fn new(
        memory: Arc<MemoryStore>,
        skills: Arc<SkillRegistry>,
        completion: Arc<CompletionClient>,
        config: &EngineConfig,
    ) -> Self {
        let prompt = PromptAdapter::new(Arc::clone(&memory), config.prompt_fragment_max_bytes);
        let learner = SkillLearner::new(Arc::clone(&memory), Arc::clone(&completion));
        Self {
            memory,
            skills,
            completion,
            intent: IntentModel::new(),
            goals: GoalStore::new(),
            planner: Planner::new(),
            prompt,
            learner,
            alive: AtomicBool::new(true),
            self_concept: "I am a local assistant engine. I can run registered skills, \
                           keep durable memory, and reason about goals. If I'm unsure, \
                           I'll say so and propose a next step."
                .to_string(),
        }
    }

    /// Collaborators handed to skill handlers
    pub fn skill_context(&self) -> SkillContext {
        SkillContext {
            memory: Arc::clone(&self.memory),
            completion: Arc::clone(&self.completion),
        }
    }

    pub fn memory(&self) -> &Arc<MemoryStore> {
        &self.memory
    }

    pub fn intent(&self) -> &IntentModel {
        &self.intent
    }

    pub fn goals(&self) -> &GoalStore {
        &self.goals
    }

    /// Define a custom step plan for a goal name
    pub fn define_plan(&self, goal_name: &str, steps: Vec<TaskSpec>) {
        self.planner.define(goal_name, steps);
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    pub fn shutdown(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    pub fn revive(&self) {
        self.alive.store(true, Ordering::SeqCst);
    }

    /// Append one entry to the durable event log
    pub fn commit_event(&self, event: &str, metadata: Value, task: Value, result: Value) {
        let entry = EventLogEntry::new(event, metadata, task, result);
        if let Ok(value) = serde_json::to_value(&entry) {
            if let Err(e) = self.memory.append_capped(EVENT_LOG_KEY, value, 0) {
                tracing::warn!("Failed to commit event: {e:#}");
            }
        }
    }

    /// Point-in-time view of the durable log
    pub fn memory_summary(&self) -> Value {
        json!({ "total_events": self.memory.list_len(EVENT_LOG_KEY) })
    }

    /// Inspect the recent event log for failure patterns (pure read)
    pub fn reflect(&self) -> Vec<String> {
        let events = self.memory.recall(EVENT_LOG_KEY, Value::Array(vec![]));
        analyze_failures(&events, 50)
    }

    /// Handle one event. Never errors outward: failures surface as a
    /// structured fail outcome.
    pub async fn handle_event(&self, event: &Event) -> Outcome {
        match event.event_type {
            EventType::SystemBoot => Outcome::done_text("Hello! Assistant engine at your service."),

            EventType::SystemShutdown => {
                self.shutdown();
                Outcome::done_text("System shutting down.")
            }

            EventType::UserInput => match event.payload_str("text") {
                Some(text) if !text.trim().is_empty() => self.handle_user_input(text).await,
                _ => Outcome::fail("user_input event requires a 'text' payload"),
            },

            EventType::MemoryWrite => match event.payload_str("text") {
                Some(text) => {
                    let append = self.memory.append_capped(
                        "user_memories",
                        json!({
                            "event": "USER_MEMORY",
                            "data": text,
                            "timestamp": chrono::Utc::now().timestamp(),
                        }),
                        0,
                    );
                    match append {
                        Ok(_) => Outcome::done_text(&format!("I will remember: {text}")),
                        Err(e) => Outcome::fail(&format!("memory write failed: {e:#}")),
                    }
                }
                None => Outcome::fail("memory_write event requires a 'text' payload"),
            },

            EventType::MemoryQuery => match event.payload_str("key") {
                Some(key) => match self.memory.get(key) {
                    Some(value) => Outcome::done(value),
                    None => Outcome::noop(&format!("no memory under '{key}'")),
                },
                None => Outcome::fail("memory_query event requires a 'key' payload"),
            },

            EventType::Reflect => {
                let insights = self.reflect();
                Outcome::done(json!(insights))
            }

            EventType::AutonomyCycle => Outcome::noop("No task proposed."),
        }
    }

    /// User input pipeline: override commands, then skill-name matching,
    /// then the completion fallback.
    async fn handle_user_input(&self, text: &str) -> Outcome {
        let lower = text.to_lowercase();

        // Preference capture runs regardless of how the turn is handled
        if PREFERENCE_CUES.iter().any(|cue| lower.contains(cue)) {
            let _ = self.memory.append_capped(
                "user_preferences",
                json!({ "text": text, "timestamp": chrono::Utc::now().timestamp() }),
                0,
            );
        }

        // 1. Override commands get first refusal
        if let Some(command) = parse_override(text) {
            return self.apply_override(command);
        }

        // 2. Literal skill-name match against the input
        for name in self.skills.names() {
            let spoken = name.replace(['_', '.'], " ");
            if lower.contains(&spoken) || lower.contains(&name) {
                debug!("Input matched skill '{}'", name);
                let task = TaskSpec::with_text(&name, text);
                let outcome = self.dispatch(&task).await;
                if outcome.is_done() {
                    let _ = self.prompt.observe_exchange(text, &outcome.result_text());
                }
                return outcome;
            }
        }

        // Unmatched capability requests queue a gap for the learner
        if self.learner.detect_gap(text).is_some() {
            let _ = self.learner.queue_request(text);
        }

        // Identity questions answer from the self-concept directly
        if IDENTITY_TRIGGERS.iter().any(|t| lower.contains(t)) {
            return Outcome::done_text(&self.self_concept);
        }

        // 3. Completion-service fallback
        self.completion_fallback(text).await
    }

    /// Apply a parsed override command to intent/goal/liveness state
    fn apply_override(&self, command: OverrideCommand) -> Outcome {
        match command {
            OverrideCommand::PauseAutonomy => {
                self.shutdown();
                Outcome::done_text("Autonomy paused.")
            }
            OverrideCommand::ResumeAutonomy => {
                self.revive();
                Outcome::done_text("Autonomy resumed.")
            }
            OverrideCommand::SetGoal(name) => {
                self.goals.set_goal(&name, 0.8, "user");
                Outcome::done_text(&format!("Goal set: {name}"))
            }
            OverrideCommand::ClearGoal => {
                self.goals.clear_active();
                Outcome::done_text("Goal cleared.")
            }
            OverrideCommand::FocusOn(name) => {
                self.intent.set_intent(&name, 0.7, IntentSource::User);
                Outcome::done_text(&format!("Focusing on: {name}"))
            }
            OverrideCommand::ShowGoal => match self.goals.active() {
                Some(goal) => Outcome::done(json!({
                    "name": goal.name,
                    "progress": goal.progress,
                    "priority": goal.priority,
                })),
                None => Outcome::noop("No active goal."),
            },
            OverrideCommand::ShowStatus => {
                let skills: Vec<Value> = self
                    .skills
                    .descriptions()
                    .into_iter()
                    .map(|(name, description)| json!({ "name": name, "description": description }))
                    .collect();
                Outcome::done(json!({
                    "alive": self.is_alive(),
                    "intent": self.intent.current(),
                    "goal": self.goals.active(),
                    "memory": self.memory_summary(),
                    "skills": skills,
                }))
            }
        }
    }

    /// Ask the completion service, store the exchange, and let the prompt
    /// adapter observe it. Service failure degrades to a fail outcome.
    async fn completion_fallback(&self, text: &str) -> Outcome {
        let mut messages = Vec::new();
        let fragment = self.prompt.fragment();
        let system = if fragment.is_empty() {
            self.self_concept.clone()
        } else {
            format!("{}\n{}", self.self_concept, fragment)
        };
        messages.push(ChatMessage::system(&system));
        messages.push(ChatMessage::user(text));

        let reply = match self.completion.chat(&messages).await {
            Ok(reply) => reply,
            Err(e) => {
                return Outcome::fail(&format!("completion service unavailable: {e:#}"));
            }
        };

        let _ = self.memory.append_capped(
            CONVERSATION_LOG_KEY,
            json!({
                "user": text,
                "assistant": reply,
                "timestamp": chrono::Utc::now().timestamp(),
            }),
            0,
        );

        self.commit_event(
            EventType::UserInput.as_str(),
            Value::Null,
            json!({ "action": "completion_fallback" }),
            json!({ "status": "done" }),
        );

        let _ = self.prompt.observe_exchange(text, &reply);
        Outcome::done_text(&reply)
    }

    /// Dispatch a typed task through the registry, logging the outcome
    pub async fn dispatch(&self, task: &TaskSpec) -> Outcome {
        self.dispatch_with_meta(task, Value::Null).await
    }

    /// Dispatch with caller-supplied log metadata. The `execute_goal`
    /// pseudo-action expands through the planner and executes its steps
    /// strictly in order; a failing step is logged and the sequence
    /// continues.
    pub async fn dispatch_with_meta(&self, task: &TaskSpec, metadata: Value) -> Outcome {
        if task.action == "execute_goal" {
            let goal_name = match task.param_str("goal_name") {
                Some(name) => name.to_string(),
                None => return Outcome::fail("execute_goal requires a 'goal_name' parameter"),
            };
            return self.execute_goal(&goal_name, metadata).await;
        }

        let ctx = self.skill_context();
        let outcome = self.skills.execute(&ctx, &task.action, &task.params).await;
        self.commit_event(
            "dispatch",
            metadata,
            serde_json::to_value(task).unwrap_or(Value::Null),
            serde_json::to_value(&outcome).unwrap_or(Value::Null),
        );
        outcome
    }

    async fn execute_goal(&self, goal_name: &str, metadata: Value) -> Outcome {
        let steps = self.planner.plan_for_goal(goal_name);
        info!("Executing goal '{}' ({} steps)", goal_name, steps.len());

        let ctx = self.skill_context();
        let mut results = Vec::with_capacity(steps.len());
        for step in &steps {
            let outcome = self.skills.execute(&ctx, &step.action, &step.params).await;
            let mut meta = json!({ "goal": goal_name });
            if let (Some(obj), Some(extra)) = (meta.as_object_mut(), metadata.as_object()) {
                for (k, v) in extra {
                    obj.insert(k.clone(), v.clone());
                }
            }
            self.commit_event(
                "goal_task",
                meta,
                serde_json::to_value(step).unwrap_or(Value::Null),
                serde_json::to_value(&outcome).unwrap_or(Value::Null),
            );
            results.push(serde_json::to_value(&outcome).unwrap_or(Value::Null));
        }

        Outcome::done(Value::Array(results))
    }
}
