//! Built-in Skills
//!
//! The small set of handlers registered at startup: echo, greet, and the
//! memory read/write actions the planner targets.

use super::registry::SkillRegistry;
use super::types::{Outcome, SkillContext, SkillHandler};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

/// Repeat the given text back
struct EchoSkill;

#[async_trait]
impl SkillHandler for EchoSkill {
    async fn execute(&self, _ctx: &SkillContext, params: &Value) -> anyhow::Result<Outcome> {
        let text = params.get("text").and_then(Value::as_str).unwrap_or("");
        Ok(Outcome::done_text(text))
    }
}

/// Greet a named user
struct GreetSkill;

#[async_trait]
impl SkillHandler for GreetSkill {
    async fn execute(&self, _ctx: &SkillContext, params: &Value) -> anyhow::Result<Outcome> {
        let name = params.get("name").and_then(Value::as_str).unwrap_or("there");
        Ok(Outcome::done_text(&format!("Hello, {name}!")))
    }
}

/// Append a note to the durable user memory list
struct MemoryWriteSkill;

#[async_trait]
impl SkillHandler for MemoryWriteSkill {
    async fn execute(&self, ctx: &SkillContext, params: &Value) -> anyhow::Result<Outcome> {
        let text = match params.get("text").and_then(Value::as_str) {
            Some(t) if !t.is_empty() => t,
            _ => return Ok(Outcome::fail("memory.write requires a 'text' parameter")),
        };

        ctx.memory.append_capped(
            "user_memories",
            json!({
                "event": "USER_MEMORY",
                "data": text,
                "timestamp": chrono::Utc::now().timestamp(),
            }),
            0,
        )?;

        Ok(Outcome::done_text(&format!("I will remember: {text}")))
    }
}

/// Recall stored user memories, optionally filtered by a query substring
struct MemoryRecallSkill;

#[async_trait]
impl SkillHandler for MemoryRecallSkill {
    async fn execute(&self, ctx: &SkillContext, params: &Value) -> anyhow::Result<Outcome> {
        let query = params
            .get("query")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_lowercase();

        let memories = ctx.memory.recall("user_memories", Value::Array(vec![]));
        let matches: Vec<Value> = memories
            .as_array()
            .map(|arr| {
                arr.iter()
                    .filter(|m| {
                        query.is_empty()
                            || m.get("data")
                                .and_then(Value::as_str)
                                .map(|d| d.to_lowercase().contains(&query))
                                .unwrap_or(false)
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if matches.is_empty() {
            Ok(Outcome::noop("no matching memories"))
        } else {
            Ok(Outcome::done(Value::Array(matches)))
        }
    }
}

/// Register the built-in skill set into a registry
pub fn register_builtins(registry: &SkillRegistry) {
    registry.register("echo", "Repeat the given text", Arc::new(EchoSkill));
    registry.register("greet", "Greet a user by name", Arc::new(GreetSkill));
    registry.register(
        "memory.write",
        "Append a note to durable user memory",
        Arc::new(MemoryWriteSkill),
    );
    registry.register(
        "memory.recall",
        "Recall stored user memories by query",
        Arc::new(MemoryRecallSkill),
    );
}
