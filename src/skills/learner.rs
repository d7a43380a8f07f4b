//! Skill Learner
//!
//! Detects capability requests the registry cannot fulfil and, one per
//! background cycle, synthesizes a completion-backed skill for the gap
//! and registers it. Gap requests queue through the shared memory store
//! (key `knowledge_gaps`), never through orchestrator state.

use super::registry::SkillRegistry;
use super::types::{Outcome, SkillContext, SkillHandler};
use crate::completion::CompletionClient;
use crate::memory::MemoryStore;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

/// Memory key holding queued gap requests
pub const GAP_QUEUE_KEY: &str = "knowledge_gaps";

/// Memory key recording successful learnings
pub const SKILL_LEARNINGS_KEY: &str = "skill_learnings";

/// Phrases that signal the user is asking for a missing capability
const GAP_INDICATORS: &[&str] = &[
    "can you",
    "would you",
    "i wish you could",
    "learn to",
    "teach yourself",
    "figure out how",
];

/// A skill whose behavior is a persisted instruction block executed
/// through the completion service
struct LearnedSkill {
    instructions: String,
}

#[async_trait]
impl SkillHandler for LearnedSkill {
    async fn execute(&self, ctx: &SkillContext, params: &Value) -> anyhow::Result<Outcome> {
        let text = params.get("text").and_then(Value::as_str).unwrap_or("");
        let prompt = format!("{}\n\nRequest: {}", self.instructions, text);
        match ctx.completion.generate_or_none(&prompt).await {
            Some(reply) => Ok(Outcome::done_text(&reply)),
            None => Ok(Outcome::fail("completion service unavailable")),
        }
    }
}

/// Gap detection and skill synthesis
pub struct SkillLearner {
    memory: Arc<MemoryStore>,
    completion: Arc<CompletionClient>,
}

impl SkillLearner {
    pub fn new(memory: Arc<MemoryStore>, completion: Arc<CompletionClient>) -> Self {
        Self { memory, completion }
    }

    /// Does this input ask for a capability we should try to learn?
    pub fn detect_gap(&self, text: &str) -> Option<String> {
        let lower = text.to_lowercase();
        if GAP_INDICATORS.iter().any(|p| lower.contains(p)) {
            Some(Self::infer_skill_name(&lower))
        } else {
            None
        }
    }

    /// Map a request onto a skill name by coarse keyword category
    fn infer_skill_name(request: &str) -> String {
        if request.contains("file") || request.contains("folder") {
            "file_manager".to_string()
        } else if request.contains("search") || request.contains("find") {
            "search".to_string()
        } else if request.contains("web") || request.contains("fetch") || request.contains("url") {
            "web_fetch".to_string()
        } else if request.contains("code") || request.contains("program") {
            "code_runner".to_string()
        } else if request.contains("remember") {
            "memory_helper".to_string()
        } else {
            "assist".to_string()
        }
    }

    /// Queue a gap request for the background loop to pick up
    pub fn queue_request(&self, description: &str) -> anyhow::Result<()> {
        self.memory.append_capped(
            GAP_QUEUE_KEY,
            json!({
                "request": description,
                "timestamp": chrono::Utc::now().timestamp(),
            }),
            0,
        )?;
        debug!("Queued skill gap: {description}");
        Ok(())
    }

    /// Number of queued gap requests
    pub fn pending_gaps(&self) -> usize {
        self.memory.list_len(GAP_QUEUE_KEY)
    }

    /// Take the oldest queued request, synthesize instructions for it via
    /// the completion service, and register the resulting skill.
    ///
    /// Returns the learned skill name, or None when the queue is empty or
    /// the completion service declined this cycle. At most one attempt
    /// per call; on decline the request goes back on the queue.
    pub async fn learn_one(&self, registry: &SkillRegistry) -> anyhow::Result<Option<String>> {
        let mut request: Option<String> = None;
        self.memory.update(GAP_QUEUE_KEY, Value::Array(vec![]), |v| {
            if let Some(arr) = v.as_array_mut() {
                if !arr.is_empty() {
                    let first = arr.remove(0);
                    request = first
                        .get("request")
                        .and_then(Value::as_str)
                        .map(String::from);
                }
            }
        })?;

        let request = match request {
            Some(r) => r,
            None => return Ok(None),
        };

        let name = Self::infer_skill_name(&request.to_lowercase());
        let prompt = format!(
            "Write a short instruction block (2-4 sentences) for an assistant skill \
             named '{name}' that fulfils this request:\n{request}\n\n\
             The instructions should tell the skill how to respond to future inputs."
        );

        let instructions = match self.completion.generate_or_none(&prompt).await {
            Some(text) => text,
            None => {
                // Service down this cycle; put the request back for later.
                self.queue_request(&request)?;
                return Ok(None);
            }
        };

        registry.register(
            &name,
            &format!("Learned skill for: {request}"),
            Arc::new(LearnedSkill { instructions }),
        );

        self.memory.append_capped(
            SKILL_LEARNINGS_KEY,
            json!({
                "skill": name,
                "request": request,
                "timestamp": chrono::Utc::now().timestamp(),
            }),
            0,
        )?;

        info!("Learned new skill '{name}'");
        Ok(Some(name))
    }

    /// Names recorded in the learnings log
    pub fn learned_skills(&self) -> Vec<String> {
        self.memory
            .recall(SKILL_LEARNINGS_KEY, Value::Array(vec![]))
            .as_array()
            .map(|arr| {
                arr.iter()
                    .filter_map(|l| l.get("skill").and_then(Value::as_str).map(String::from))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::CompletionConfig;
    use std::time::Duration;

    fn make_learner() -> SkillLearner {
        SkillLearner::new(
            Arc::new(MemoryStore::in_memory()),
            Arc::new(
                CompletionClient::with_config(CompletionConfig {
                    base_url: "http://127.0.0.1:9".to_string(),
                    model: "test".to_string(),
                    timeout: Duration::from_secs(1),
                })
                .unwrap(),
            ),
        )
    }

    #[test]
    fn test_gap_detection() {
        let learner = make_learner();
        assert_eq!(
            learner.detect_gap("can you search the web for rust news"),
            Some("search".to_string())
        );
        assert_eq!(learner.detect_gap("hello there"), None);
    }

    #[test]
    fn test_skill_name_inference() {
        assert_eq!(SkillLearner::infer_skill_name("organize my files"), "file_manager");
        assert_eq!(SkillLearner::infer_skill_name("fetch this url"), "web_fetch");
        assert_eq!(SkillLearner::infer_skill_name("something else"), "assist");
    }

    #[test]
    fn test_queue_and_count() {
        let learner = make_learner();
        learner.queue_request("learn to fetch urls").unwrap();
        learner.queue_request("learn to run code").unwrap();
        assert_eq!(learner.pending_gaps(), 2);
    }

    #[tokio::test]
    async fn test_learn_one_requeues_when_service_down() {
        let learner = make_learner();
        let registry = SkillRegistry::new();
        learner.queue_request("learn to fetch urls").unwrap();

        // Unreachable completion service: no skill learned, request kept.
        let learned = learner.learn_one(&registry).await.unwrap();
        assert!(learned.is_none());
        assert_eq!(learner.pending_gaps(), 1);
        assert!(!registry.contains("web_fetch"));
    }

    #[tokio::test]
    async fn test_learn_one_empty_queue_is_noop() {
        let learner = make_learner();
        let registry = SkillRegistry::new();
        let learned = learner.learn_one(&registry).await.unwrap();
        assert!(learned.is_none());
    }
}
