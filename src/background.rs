//! Background Runner
//!
//! Owns the three periodic loops (curiosity, consolidation, and skill-gap
//! learning) as tokio tasks cancelled through a shared watch channel.
//! Each tick checks its loop's own predicate before doing work, so the
//! poll intervals stay cheap; a failed cycle is logged and the loop keeps
//! polling. A small in-memory activity log records what each loop did.

use crate::consolidator::MemoryConsolidator;
use crate::curiosity::CuriosityLoop;
use crate::skills::{SkillLearner, SkillRegistry};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Activity-log retention
const ACTIVITY_LOG_CAP: usize = 50;

type ActivityLog = Arc<Mutex<VecDeque<Value>>>;

fn log_activity(log: &ActivityLog, loop_name: &str, detail: &str) {
    let mut entries = log.lock();
    entries.push_back(json!({
        "loop": loop_name,
        "detail": detail,
        "timestamp": chrono::Utc::now().timestamp(),
    }));
    while entries.len() > ACTIVITY_LOG_CAP {
        entries.pop_front();
    }
}

pub struct BackgroundRunner {
    curiosity: Arc<CuriosityLoop>,
    consolidator: Arc<MemoryConsolidator>,
    learner: Arc<SkillLearner>,
    registry: Arc<SkillRegistry>,
    curiosity_poll: Duration,
    consolidation_poll: Duration,
    skill_poll: Duration,
    shutdown: Mutex<Option<watch::Sender<bool>>>,
    activity: ActivityLog,
}

impl BackgroundRunner {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        curiosity: Arc<CuriosityLoop>,
        consolidator: Arc<MemoryConsolidator>,
        learner: Arc<SkillLearner>,
        registry: Arc<SkillRegistry>,
        curiosity_poll: Duration,
        consolidation_poll: Duration,
        skill_poll: Duration,
    ) -> Self {
        Self {
            curiosity,
            consolidator,
            learner,
            registry,
            curiosity_poll,
            consolidation_poll,
            skill_poll,
            shutdown: Mutex::new(None),
            activity: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    pub fn is_running(&self) -> bool {
        self.shutdown.lock().is_some()
    }

    /// Spawn the three loops. Idempotent: a second call while running is
    /// a no-op.
    pub fn start(&self) {
        let mut guard = self.shutdown.lock();
        if guard.is_some() {
            debug!("Background runner already started");
            return;
        }
        let (tx, rx) = watch::channel(false);
        *guard = Some(tx);
        drop(guard);

        info!("Background runner starting three loops");
        self.spawn_curiosity(rx.clone());
        self.spawn_consolidation(rx.clone());
        self.spawn_skill_learning(rx);
    }

    /// Signal all loops to exit at their next poll point
    pub fn stop(&self) {
        if let Some(tx) = self.shutdown.lock().take() {
            if tx.send(true).is_err() {
                debug!("Background loops already gone");
            }
            info!("Background runner stopped");
        }
    }

    fn spawn_curiosity(&self, mut rx: watch::Receiver<bool>) {
        let curiosity = Arc::clone(&self.curiosity);
        let activity = Arc::clone(&self.activity);
        let poll = self.curiosity_poll;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(poll);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if !curiosity.should_activate() {
                            continue;
                        }
                        match curiosity.activate().await {
                            Ok(stored) if stored > 0 => {
                                log_activity(&activity, "curiosity", &format!("stored {stored} learnings"));
                            }
                            Ok(_) => {}
                            Err(e) => warn!("Curiosity cycle failed: {e:#}"),
                        }
                    }
                    _ = rx.changed() => {
                        debug!("Curiosity loop exiting");
                        break;
                    }
                }
            }
        });
    }

    fn spawn_consolidation(&self, mut rx: watch::Receiver<bool>) {
        let consolidator = Arc::clone(&self.consolidator);
        let activity = Arc::clone(&self.activity);
        let poll = self.consolidation_poll;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(poll);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if !consolidator.should_consolidate() {
                            continue;
                        }
                        match consolidator.consolidate().await {
                            Ok(report) => {
                                log_activity(
                                    &activity,
                                    "consolidation",
                                    &format!(
                                        "pruned {} events, {} conversations",
                                        report.events_pruned, report.conversations_pruned
                                    ),
                                );
                            }
                            Err(e) => warn!("Consolidation failed: {e:#}"),
                        }
                    }
                    _ = rx.changed() => {
                        debug!("Consolidation loop exiting");
                        break;
                    }
                }
            }
        });
    }

    fn spawn_skill_learning(&self, mut rx: watch::Receiver<bool>) {
        let learner = Arc::clone(&self.learner);
        let registry = Arc::clone(&self.registry);
        let activity = Arc::clone(&self.activity);
        let poll = self.skill_poll;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(poll);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if learner.pending_gaps() == 0 {
                            continue;
                        }
                        match learner.learn_one(&registry).await {
                            Ok(Some(name)) => {
                                log_activity(&activity, "skill_learning", &format!("learned '{name}'"));
                            }
                            Ok(None) => {}
                            Err(e) => warn!("Skill learning cycle failed: {e:#}"),
                        }
                    }
                    _ = rx.changed() => {
                        debug!("Skill learning loop exiting");
                        break;
                    }
                }
            }
        });
    }

    /// Note user activity so curiosity stays dormant
    pub fn record_activity(&self) {
        self.curiosity.update_activity();
    }

    /// Queue a capability request for the skill-gap loop
    pub fn request_skill_learning(&self, description: &str) -> anyhow::Result<()> {
        self.learner.queue_request(description)
    }

    /// Run a curiosity exploration right now, bypassing the idle check
    pub async fn trigger_curiosity(&self) -> anyhow::Result<usize> {
        let stored = self.curiosity.activate().await?;
        log_activity(&self.activity, "curiosity", &format!("manual trigger stored {stored}"));
        Ok(stored)
    }

    /// Run a consolidation pass right now, bypassing the interval check
    pub async fn trigger_consolidation(&self) -> anyhow::Result<()> {
        let report = self.consolidator.consolidate().await?;
        log_activity(
            &self.activity,
            "consolidation",
            &format!("manual trigger pruned {} events", report.events_pruned),
        );
        Ok(())
    }

    pub fn get_status(&self) -> Value {
        let activity: Vec<Value> = self.activity.lock().iter().cloned().collect();
        json!({
            "running": self.is_running(),
            "curiosity": self.curiosity.status(),
            "consolidation": self.consolidator.status(),
            "pending_skill_gaps": self.learner.pending_gaps(),
            "learned_skills": self.learner.learned_skills(),
            "recent_activity": activity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::{CompletionClient, CompletionConfig};
    use crate::memory::MemoryStore;
    use crate::skills::register_builtins;

    fn make_runner(poll: Duration) -> BackgroundRunner {
        let memory = Arc::new(MemoryStore::in_memory());
        let completion = Arc::new(
            CompletionClient::with_config(CompletionConfig {
                base_url: "http://127.0.0.1:9".to_string(),
                model: "test".to_string(),
                timeout: Duration::from_secs(1),
            })
            .unwrap(),
        );
        let registry = Arc::new(SkillRegistry::new());
        register_builtins(&registry);
        BackgroundRunner::new(
            Arc::new(CuriosityLoop::new(
                Arc::clone(&memory),
                Arc::clone(&completion),
                Duration::from_secs(600),
            )),
            Arc::new(MemoryConsolidator::new(
                Arc::clone(&memory),
                Arc::clone(&completion),
                Duration::from_secs(3600),
                100,
                50,
                20,
                10,
            )),
            Arc::new(SkillLearner::new(Arc::clone(&memory), completion)),
            registry,
            poll,
            poll,
            poll,
        )
    }

    #[tokio::test]
    async fn test_start_stop_lifecycle() {
        let runner = make_runner(Duration::from_millis(50));
        assert!(!runner.is_running());
        runner.start();
        assert!(runner.is_running());
        // second start is a no-op
        runner.start();
        tokio::time::sleep(Duration::from_millis(120)).await;
        runner.stop();
        assert!(!runner.is_running());
        // stopping again does not panic
        runner.stop();
    }

    #[tokio::test]
    async fn test_skill_requests_route_to_learner() {
        let runner = make_runner(Duration::from_secs(60));
        runner.request_skill_learning("learn to fetch urls").unwrap();
        assert_eq!(runner.get_status()["pending_skill_gaps"], json!(1));
    }

    #[tokio::test]
    async fn test_status_shape() {
        let runner = make_runner(Duration::from_secs(60));
        let status = runner.get_status();
        assert_eq!(status["running"], json!(false));
        assert!(status["curiosity"]["idle_secs"].is_number());
        assert!(status["consolidation"]["interval_secs"].is_number());
        assert!(status["learned_skills"].as_array().unwrap().is_empty());
        assert!(status["recent_activity"].as_array().unwrap().is_empty());
    }
}
