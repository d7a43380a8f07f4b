//! Skill Type Definitions
//!
//! Core data structures for the skill system: the uniform invoke/result
//! contract and the handler trait every skill implements.

use crate::completion::CompletionClient;
use crate::memory::MemoryStore;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

/// Outcome status for any dispatched action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Action completed
    Done,
    /// Action failed; `result` carries a message
    Fail,
    /// Nothing to do
    Noop,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Done => "done",
            Self::Fail => "fail",
            Self::Noop => "noop",
        }
    }
}

/// Uniform result of every skill invocation and event dispatch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Outcome {
    pub status: Status,
    pub result: Value,
}

impl Outcome {
    pub fn done(result: Value) -> Self {
        Self { status: Status::Done, result }
    }

    pub fn done_text(text: &str) -> Self {
        Self::done(json!(text))
    }

    pub fn fail(message: &str) -> Self {
        Self { status: Status::Fail, result: json!(message) }
    }

    pub fn noop(message: &str) -> Self {
        Self { status: Status::Noop, result: json!(message) }
    }

    pub fn is_done(&self) -> bool {
        self.status == Status::Done
    }

    /// Result as display text where possible
    pub fn result_text(&self) -> String {
        match &self.result {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// A typed action request: what to run and with which parameters.
/// This is the only shape the registry accepts; free text never reaches it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSpec {
    pub action: String,
    #[serde(default)]
    pub params: Value,
}

impl TaskSpec {
    pub fn new(action: &str, params: Value) -> Self {
        Self { action: action.to_string(), params }
    }

    /// Task carrying only a text parameter
    pub fn with_text(action: &str, text: &str) -> Self {
        Self::new(action, json!({ "text": text }))
    }

    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(Value::as_str)
    }
}

/// Shared collaborators handed to every skill invocation.
///
/// Handlers may read/write the memory store and call the completion
/// service; they have no access to intent/goal state, which stays owned
/// by the orchestrator.
#[derive(Clone)]
pub struct SkillContext {
    pub memory: Arc<MemoryStore>,
    pub completion: Arc<CompletionClient>,
}

/// Contract for a named, registered unit of executable behavior.
///
/// A well-behaved handler returns `Outcome::fail` on internal error; the
/// dispatch boundary converts any `Err` it does return into a fail
/// outcome, so handler faults never reach the caller as errors.
#[async_trait]
pub trait SkillHandler: Send + Sync {
    async fn execute(&self, ctx: &SkillContext, params: &Value) -> anyhow::Result<Outcome>;
}
