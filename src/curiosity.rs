//! Curiosity Loop
//!
//! When the user has been idle long enough, this loop mines recent
//! activity for topics, asks the completion service a handful of
//! self-directed questions about them, and stores whatever comes back as
//! curiosity learnings. With no recent activity it falls back to a fixed
//! set of interest clusters. A re-entrancy flag keeps at most one
//! exploration in flight.

use crate::completion::CompletionClient;
use crate::events::{CONVERSATION_LOG_KEY, EVENT_LOG_KEY};
use crate::memory::MemoryStore;
use rand::seq::SliceRandom;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Memory key for stored curiosity learnings
pub const CURIOSITY_LEARNINGS_KEY: &str = "curiosity_learnings";

/// Questions asked per exploration, at most
const QUESTIONS_PER_RUN: usize = 3;

/// Fallback topics when recent activity yields nothing
const INTEREST_CLUSTERS: &[&str] = &[
    "AI agents",
    "LLM optimization",
    "automation",
    "productivity",
    "programming",
    "self-improvement",
];

const QUESTION_TEMPLATES: &[&str] = &[
    "What is an interesting fact about {topic}?",
    "What do people commonly get wrong about {topic}?",
    "What is a practical tip related to {topic}?",
    "How has {topic} changed recently?",
];

pub struct CuriosityLoop {
    memory: Arc<MemoryStore>,
    completion: Arc<CompletionClient>,
    /// Unix timestamp of the last observed user activity
    last_activity: AtomicI64,
    /// Re-entrancy guard, true while an exploration is in flight
    active: AtomicBool,
    min_idle: Duration,
}

impl CuriosityLoop {
    pub fn new(
        memory: Arc<MemoryStore>,
        completion: Arc<CompletionClient>,
        min_idle: Duration,
    ) -> Self {
        Self {
            memory,
            completion,
            last_activity: AtomicI64::new(chrono::Utc::now().timestamp()),
            active: AtomicBool::new(false),
            min_idle,
        }
    }

    /// Record user activity, resetting the idle clock
    pub fn update_activity(&self) {
        self.last_activity
            .store(chrono::Utc::now().timestamp(), Ordering::Relaxed);
    }

    pub fn idle_secs(&self) -> i64 {
        chrono::Utc::now().timestamp() - self.last_activity.load(Ordering::Relaxed)
    }

    /// Idle long enough and no exploration already running
    pub fn should_activate(&self) -> bool {
        self.idle_secs() >= self.min_idle.as_secs() as i64 && !self.active.load(Ordering::Relaxed)
    }

    /// Topics mined from recent event tasks and conversation text.
    /// Deduplicated, capped at five.
    pub fn extract_topics(&self) -> Vec<String> {
        let mut topics = Vec::new();
        let mut seen = HashSet::new();

        let events = self.memory.recall(EVENT_LOG_KEY, Value::Array(vec![]));
        if let Some(entries) = events.as_array() {
            for entry in entries.iter().rev().take(20) {
                if let Some(action) = entry
                    .get("task")
                    .and_then(|t| t.get("action"))
                    .and_then(Value::as_str)
                {
                    if seen.insert(action.to_string()) {
                        topics.push(action.to_string());
                    }
                }
            }
        }

        let conversations = self.memory.recall(CONVERSATION_LOG_KEY, Value::Array(vec![]));
        if let Some(turns) = conversations.as_array() {
            for turn in turns.iter().rev().take(10) {
                if let Some(text) = turn.get("user").and_then(Value::as_str) {
                    for word in text.split_whitespace() {
                        let word = word.trim_matches(|c: char| !c.is_alphanumeric());
                        if word.len() > 5 && seen.insert(word.to_lowercase()) {
                            topics.push(word.to_lowercase());
                        }
                    }
                }
            }
        }

        topics.truncate(5);
        topics
    }

    /// Up to three questions about recent topics, falling back to the
    /// fixed interest clusters when nothing recent surfaced
    pub fn generate_questions(&self) -> Vec<String> {
        let mut topics = self.extract_topics();
        let mut rng = rand::thread_rng();
        if topics.is_empty() {
            topics = INTEREST_CLUSTERS
                .choose_multiple(&mut rng, QUESTIONS_PER_RUN)
                .map(|s| s.to_string())
                .collect();
        }

        topics
            .iter()
            .take(QUESTIONS_PER_RUN)
            .map(|topic| {
                let template = QUESTION_TEMPLATES
                    .choose(&mut rng)
                    .unwrap_or(&QUESTION_TEMPLATES[0]);
                template.replace("{topic}", topic)
            })
            .collect()
    }

    /// One exploration: ask the questions, store whatever answers arrive.
    /// Returns the number of learnings stored. Always resets the idle
    /// clock so one run is not immediately followed by another.
    pub async fn activate(&self) -> anyhow::Result<usize> {
        if self.active.swap(true, Ordering::SeqCst) {
            return Ok(0);
        }

        let result = self.explore().await;
        self.active.store(false, Ordering::SeqCst);
        self.update_activity();
        result
    }

    async fn explore(&self) -> anyhow::Result<usize> {
        let questions = self.generate_questions();
        info!("Curiosity activated with {} questions", questions.len());

        let mut stored = 0;
        for question in &questions {
            let prompt = format!(
                "Answer briefly, in one or two sentences, as a note to self: {question}"
            );
            match self.completion.generate_or_none(&prompt).await {
                Some(insight) => {
                    self.memory.append_capped(
                        CURIOSITY_LEARNINGS_KEY,
                        json!({
                            "question": question,
                            "insight": insight,
                            "timestamp": chrono::Utc::now().timestamp(),
                        }),
                        0,
                    )?;
                    stored += 1;
                }
                None => {
                    debug!("No answer for curiosity question; skipping the rest");
                    break;
                }
            }
        }

        info!("Curiosity stored {} learnings", stored);
        Ok(stored)
    }

    pub fn status(&self) -> Value {
        json!({
            "idle_secs": self.idle_secs(),
            "min_idle_secs": self.min_idle.as_secs(),
            "active": self.active.load(Ordering::Relaxed),
            "learnings": self.memory.list_len(CURIOSITY_LEARNINGS_KEY),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::CompletionConfig;

    fn make_loop(min_idle: Duration) -> CuriosityLoop {
        let completion = CompletionClient::with_config(CompletionConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            model: "test".to_string(),
            timeout: Duration::from_secs(1),
        })
        .unwrap();
        CuriosityLoop::new(
            Arc::new(MemoryStore::in_memory()),
            Arc::new(completion),
            min_idle,
        )
    }

    #[test]
    fn test_activation_requires_idleness() {
        let curiosity = make_loop(Duration::from_secs(600));
        curiosity.update_activity();
        assert!(!curiosity.should_activate());

        let idle = make_loop(Duration::ZERO);
        assert!(idle.should_activate());
    }

    #[test]
    fn test_questions_fall_back_to_interest_clusters() {
        let curiosity = make_loop(Duration::ZERO);
        let questions = curiosity.generate_questions();
        assert_eq!(questions.len(), QUESTIONS_PER_RUN);
        assert!(questions
            .iter()
            .all(|q| INTEREST_CLUSTERS.iter().any(|c| q.contains(c))));
    }

    #[test]
    fn test_topics_mined_from_conversations() {
        let curiosity = make_loop(Duration::ZERO);
        curiosity
            .memory
            .append_capped(
                CONVERSATION_LOG_KEY,
                json!({ "user": "tell me about astronomy and telescopes", "assistant": "ok" }),
                0,
            )
            .unwrap();

        let topics = curiosity.extract_topics();
        assert!(topics.contains(&"astronomy".to_string()));
        assert!(topics.contains(&"telescopes".to_string()));
        // short words are skipped
        assert!(!topics.contains(&"about".to_string()));
    }

    #[tokio::test]
    async fn test_activation_without_service_stores_nothing() {
        let curiosity = make_loop(Duration::ZERO);
        let stored = curiosity.activate().await.unwrap();
        assert_eq!(stored, 0);
        assert_eq!(curiosity.memory.list_len(CURIOSITY_LEARNINGS_KEY), 0);
        // the idle clock was still reset
        assert!(!curiosity.should_activate() || curiosity.min_idle.is_zero());
        assert!(curiosity.idle_secs() <= 1);
    }
}
