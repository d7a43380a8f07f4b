//! Memory Consolidation
//!
//! Periodic housekeeping over the memory store: summarize recent
//! conversation into a rolling window, derive usage statistics from the
//! event log, distill a couple of insights from recent learnings, and
//! prune the unbounded logs down to their retention caps. Each phase
//! degrades independently when the completion service is down; pruning
//! always runs.

use crate::completion::CompletionClient;
use crate::curiosity::CURIOSITY_LEARNINGS_KEY;
use crate::events::{CONVERSATION_LOG_KEY, EVENT_LOG_KEY};
use crate::memory::MemoryStore;
use crate::skills::SKILL_LEARNINGS_KEY;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Rolling conversation summaries
pub const SUMMARIES_KEY: &str = "conversation_summaries";

/// Distilled long-term insights
pub const INSIGHTS_KEY: &str = "insights";

/// Usage statistics computed from the event log
pub const USAGE_STATS_KEY: &str = "usage_stats";

/// User feedback entries, rated elsewhere, read here for stats
pub const FEEDBACK_KEY: &str = "feedback";

/// What one consolidation pass accomplished
#[derive(Debug, Default)]
pub struct ConsolidationReport {
    pub summarized: bool,
    pub insights_added: usize,
    pub events_pruned: usize,
    pub conversations_pruned: usize,
}

pub struct MemoryConsolidator {
    memory: Arc<MemoryStore>,
    completion: Arc<CompletionClient>,
    last_run: AtomicI64,
    interval: Duration,
    event_log_cap: usize,
    conversation_cap: usize,
    insight_cap: usize,
    summary_cap: usize,
}

impl MemoryConsolidator {
    pub fn new(
        memory: Arc<MemoryStore>,
        completion: Arc<CompletionClient>,
        interval: Duration,
        event_log_cap: usize,
        conversation_cap: usize,
        insight_cap: usize,
        summary_cap: usize,
    ) -> Self {
        Self {
            memory,
            completion,
            last_run: AtomicI64::new(0),
            interval,
            event_log_cap,
            conversation_cap,
            insight_cap,
            summary_cap,
        }
    }

    pub fn secs_since_last_run(&self) -> i64 {
        chrono::Utc::now().timestamp() - self.last_run.load(Ordering::Relaxed)
    }

    /// Enough time elapsed since the previous run
    pub fn should_consolidate(&self) -> bool {
        self.secs_since_last_run() >= self.interval.as_secs() as i64
    }

    /// One full consolidation pass
    pub async fn consolidate(&self) -> anyhow::Result<ConsolidationReport> {
        self.last_run
            .store(chrono::Utc::now().timestamp(), Ordering::Relaxed);
        info!("Consolidation starting");

        let mut report = ConsolidationReport::default();

        report.summarized = self.summarize_conversations().await?;
        self.compute_usage_stats()?;
        report.insights_added = self.distill_insights().await?;

        report.events_pruned = self.memory.truncate_to(EVENT_LOG_KEY, self.event_log_cap)?;
        report.conversations_pruned = self
            .memory
            .truncate_to(CONVERSATION_LOG_KEY, self.conversation_cap)?;

        info!(
            "Consolidation done: summarized={} insights={} pruned events={} conversations={}",
            report.summarized, report.insights_added, report.events_pruned, report.conversations_pruned
        );
        Ok(report)
    }

    /// Summarize the last few conversation turns into the rolling window
    async fn summarize_conversations(&self) -> anyhow::Result<bool> {
        let conversations = self.memory.recall(CONVERSATION_LOG_KEY, Value::Array(vec![]));
        let turns = match conversations.as_array() {
            Some(t) if !t.is_empty() => t.clone(),
            _ => return Ok(false),
        };

        let recent: Vec<String> = turns
            .iter()
            .rev()
            .take(10)
            .rev()
            .filter_map(|turn| {
                let user = turn.get("user").and_then(Value::as_str)?;
                let reply = turn.get("assistant").and_then(Value::as_str)?;
                Some(format!("User: {user}\nAssistant: {reply}"))
            })
            .collect();
        if recent.is_empty() {
            return Ok(false);
        }

        let prompt = format!(
            "Summarize the following exchanges in two sentences, keeping any \
             facts about the user:\n\n{}",
            recent.join("\n\n")
        );
        let summary = match self.completion.generate_or_none(&prompt).await {
            Some(s) => s,
            None => return Ok(false),
        };

        self.memory.append_capped(
            SUMMARIES_KEY,
            json!({
                "summary": summary,
                "turns_covered": recent.len(),
                "timestamp": chrono::Utc::now().timestamp(),
            }),
            self.summary_cap,
        )?;
        Ok(true)
    }

    /// Frequency counts over event task actions and feedback ratings,
    /// stored whole
    fn compute_usage_stats(&self) -> anyhow::Result<()> {
        let events = self.memory.recall(EVENT_LOG_KEY, Value::Array(vec![]));
        let entries = match events.as_array() {
            Some(e) if !e.is_empty() => e,
            _ => return Ok(()),
        };

        let mut actions: HashMap<String, usize> = HashMap::new();
        let mut failures = 0usize;
        for entry in entries {
            if let Some(action) = entry
                .get("task")
                .and_then(|t| t.get("action"))
                .and_then(Value::as_str)
            {
                *actions.entry(action.to_string()).or_insert(0) += 1;
            }
            if entry
                .get("result")
                .and_then(|r| r.get("status"))
                .and_then(Value::as_str)
                == Some("fail")
            {
                failures += 1;
            }
        }

        let mut ratings: HashMap<String, usize> = HashMap::new();
        let feedback = self.memory.recall(FEEDBACK_KEY, Value::Array(vec![]));
        if let Some(items) = feedback.as_array() {
            for item in items {
                if let Some(rating) = item.get("rating").and_then(Value::as_str) {
                    *ratings.entry(rating.to_string()).or_insert(0) += 1;
                }
            }
        }

        self.memory.remember(
            USAGE_STATS_KEY,
            json!({
                "total_events": entries.len(),
                "failures": failures,
                "actions": actions,
                "ratings": ratings,
                "computed_at": chrono::Utc::now().timestamp(),
            }),
        )?;
        debug!("Usage stats recomputed over {} events", entries.len());
        Ok(())
    }

    /// Distill up to two insights from recent learnings
    async fn distill_insights(&self) -> anyhow::Result<usize> {
        let mut material: Vec<String> = Vec::new();
        for key in [CURIOSITY_LEARNINGS_KEY, SKILL_LEARNINGS_KEY] {
            let learnings = self.memory.recall(key, Value::Array(vec![]));
            if let Some(entries) = learnings.as_array() {
                for entry in entries.iter().rev().take(5) {
                    if let Some(text) = entry
                        .get("insight")
                        .or_else(|| entry.get("instructions"))
                        .and_then(Value::as_str)
                    {
                        material.push(text.to_string());
                    }
                }
            }
        }
        if material.is_empty() {
            return Ok(0);
        }

        let prompt = format!(
            "From these notes, state at most two durable insights, one per \
             line, no numbering:\n\n{}",
            material.join("\n")
        );
        let response = match self.completion.generate_or_none(&prompt).await {
            Some(r) => r,
            None => return Ok(0),
        };

        let mut added = 0;
        for line in response.lines().map(str::trim).filter(|l| !l.is_empty()).take(2) {
            self.memory.append_capped(
                INSIGHTS_KEY,
                json!({
                    "insight": line,
                    "timestamp": chrono::Utc::now().timestamp(),
                }),
                self.insight_cap,
            )?;
            added += 1;
        }
        Ok(added)
    }

    pub fn status(&self) -> Value {
        json!({
            "secs_since_last_run": self.secs_since_last_run(),
            "interval_secs": self.interval.as_secs(),
            "summaries": self.memory.list_len(SUMMARIES_KEY),
            "insights": self.memory.list_len(INSIGHTS_KEY),
        })
    }
}
