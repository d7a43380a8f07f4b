//! Skill Registry & Dispatch
//!
//! Name → handler mapping with a uniform invocation contract. The registry
//! is an explicit value built at startup and passed to the orchestrator;
//! re-registering a name overwrites silently (last registration wins).
//! The skill-gap loop registers learned skills at runtime, so the map
//! sits behind a read-mostly lock.

use super::types::{Outcome, SkillContext, SkillHandler};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// A registered skill
#[derive(Clone)]
pub struct SkillEntry {
    pub name: String,
    pub description: String,
    handler: Arc<dyn SkillHandler>,
}

/// Process-wide registry of named actions
pub struct SkillRegistry {
    skills: RwLock<HashMap<String, SkillEntry>>,
}

impl SkillRegistry {
    pub fn new() -> Self {
        Self { skills: RwLock::new(HashMap::new()) }
    }

    /// Register a handler under a name. Last registration wins.
    pub fn register(&self, name: &str, description: &str, handler: Arc<dyn SkillHandler>) {
        let entry = SkillEntry {
            name: name.to_string(),
            description: description.to_string(),
            handler,
        };
        let previous = self.skills.write().insert(name.to_string(), entry);
        if previous.is_some() {
            debug!("Skill '{}' re-registered", name);
        } else {
            debug!("Skill '{}' registered", name);
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.skills.read().contains_key(name)
    }

    /// All registered action names
    pub fn names(&self) -> Vec<String> {
        self.skills.read().keys().cloned().collect()
    }

    /// Name and description of every registered skill
    pub fn descriptions(&self) -> Vec<(String, String)> {
        self.skills
            .read()
            .values()
            .map(|e| (e.name.clone(), e.description.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.skills.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.read().is_empty()
    }

    /// Execute a named action. Never returns an error to the caller:
    /// unknown names and handler faults both surface as a fail outcome.
    pub async fn execute(&self, ctx: &SkillContext, name: &str, params: &Value) -> Outcome {
        let handler = {
            let skills = self.skills.read();
            match skills.get(name) {
                Some(entry) => Arc::clone(&entry.handler),
                None => {
                    return Outcome::fail(&format!("unknown action: {name}"));
                }
            }
        };

        match handler.execute(ctx, params).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Skill '{}' errored: {e:#}", name);
                Outcome::fail(&format!("skill '{name}' error: {e:#}"))
            }
        }
    }
}

impl Default for SkillRegistry {
    fn default() -> Self {
        Self::new()
    }
}
