//! End-to-end tests wiring the full engine together: durable store,
//! orchestrator pipeline, goal execution, background runner lifecycle.

use assistant_engine::events::EVENT_LOG_KEY;
use assistant_engine::skills::register_builtins;
use assistant_engine::{
    BackgroundRunner, CompletionClient, CompletionConfig, CuriosityLoop, EngineConfig, Event,
    EventType, MemoryConsolidator, MemoryStore, Orchestrator, SkillLearner, SkillRegistry, Status,
    TaskSpec,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

fn unreachable_completion() -> Arc<CompletionClient> {
    Arc::new(
        CompletionClient::with_config(CompletionConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            model: "test".to_string(),
            timeout: Duration::from_secs(1),
        })
        .unwrap(),
    )
}

fn make_orchestrator(memory: Arc<MemoryStore>) -> Orchestrator {
    let skills = Arc::new(SkillRegistry::new());
    register_builtins(&skills);
    Orchestrator::new(memory, skills, unreachable_completion(), &EngineConfig::default())
}

#[tokio::test]
async fn goal_execution_continues_past_failing_step() {
    let orch = make_orchestrator(Arc::new(MemoryStore::in_memory()));
    orch.define_plan(
        "three step plan",
        vec![
            TaskSpec::with_text("echo", "first"),
            TaskSpec::with_text("no_such_skill", "second"),
            TaskSpec::with_text("echo", "third"),
        ],
    );

    let task = TaskSpec::new("execute_goal", json!({ "goal_name": "three step plan" }));
    let outcome = orch.dispatch(&task).await;

    assert!(outcome.is_done());
    let results = outcome.result.as_array().unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0]["status"], "done");
    assert_eq!(results[1]["status"], "fail");
    assert_eq!(results[2]["status"], "done");

    // Every step, including the failure, is in the event log in order
    let events = orch.memory().recall(EVENT_LOG_KEY, Value::Null);
    let events = events.as_array().unwrap();
    assert_eq!(events.len(), 3);
    assert_eq!(events[1]["task"]["action"], "no_such_skill");
    assert_eq!(events[1]["result"]["status"], "fail");
}

#[tokio::test]
async fn event_log_appends_preserve_order() {
    let orch = make_orchestrator(Arc::new(MemoryStore::in_memory()));
    for i in 0..5 {
        let task = TaskSpec::with_text("echo", &format!("message {i}"));
        orch.dispatch(&task).await;
    }

    let events = orch.memory().recall(EVENT_LOG_KEY, Value::Null);
    let events = events.as_array().unwrap();
    assert_eq!(events.len(), 5);
    for (i, entry) in events.iter().enumerate() {
        assert_eq!(
            entry["task"]["params"]["text"].as_str().unwrap(),
            format!("message {i}")
        );
    }
}

#[tokio::test]
async fn override_commands_take_priority_over_skills() {
    let orch = make_orchestrator(Arc::new(MemoryStore::in_memory()));

    // Contains the registered skill name "echo" but parses as an override
    let outcome = orch.handle_event(&Event::user_input("set goal echo everything")).await;
    assert!(outcome.is_done());
    assert_eq!(orch.goals().active().unwrap().name, "echo everything");
    // No dispatch happened, so the event log is untouched
    assert_eq!(orch.memory().list_len(EVENT_LOG_KEY), 0);
}

#[tokio::test]
async fn unknown_input_degrades_without_service() {
    let orch = make_orchestrator(Arc::new(MemoryStore::in_memory()));
    let outcome = orch.handle_event(&Event::user_input("summarize chapter four")).await;
    assert_eq!(outcome.status, Status::Fail);
    assert!(outcome.result_text().contains("unavailable"));
}

#[test]
fn concurrent_writers_never_lose_a_key() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = Arc::new(MemoryStore::open(dir.path().join("memory.json")).unwrap());

    let a = Arc::clone(&store);
    let b = Arc::clone(&store);
    let t1 = std::thread::spawn(move || {
        for i in 0..50 {
            a.remember(&format!("alpha_{i}"), json!(i)).unwrap();
        }
    });
    let t2 = std::thread::spawn(move || {
        for i in 0..50 {
            b.remember(&format!("beta_{i}"), json!(i)).unwrap();
        }
    });
    t1.join().unwrap();
    t2.join().unwrap();

    assert_eq!(store.key_count(), 100);

    // The file on disk holds every key too
    let reopened = MemoryStore::open(dir.path().join("memory.json")).unwrap();
    assert_eq!(reopened.key_count(), 100);
}

#[tokio::test]
async fn consolidation_prunes_oversized_logs() {
    let memory = Arc::new(MemoryStore::in_memory());
    let entries: Vec<Value> = (0..150)
        .map(|i| json!({ "task": { "action": "echo" }, "result": { "status": "done" }, "n": i }))
        .collect();
    memory.remember(EVENT_LOG_KEY, Value::Array(entries)).unwrap();

    let consolidator = MemoryConsolidator::new(
        Arc::clone(&memory),
        unreachable_completion(),
        Duration::from_secs(3600),
        100,
        50,
        20,
        10,
    );
    let report = consolidator.consolidate().await.unwrap();

    assert_eq!(report.events_pruned, 50);
    assert_eq!(memory.list_len(EVENT_LOG_KEY), 100);
    // Most recent entries survive
    let events = memory.recall(EVENT_LOG_KEY, Value::Null);
    let events = events.as_array().unwrap();
    assert_eq!(events[0]["n"], json!(50));
    assert_eq!(events[99]["n"], json!(149));
}

#[tokio::test]
async fn background_runner_stops_cleanly() {
    let memory = Arc::new(MemoryStore::in_memory());
    let completion = unreachable_completion();
    let skills = Arc::new(SkillRegistry::new());
    register_builtins(&skills);

    let runner = BackgroundRunner::new(
        Arc::new(CuriosityLoop::new(
            Arc::clone(&memory),
            Arc::clone(&completion),
            Duration::ZERO,
        )),
        Arc::new(MemoryConsolidator::new(
            Arc::clone(&memory),
            Arc::clone(&completion),
            Duration::ZERO,
            100,
            50,
            20,
            10,
        )),
        Arc::new(SkillLearner::new(Arc::clone(&memory), Arc::clone(&completion))),
        skills,
        Duration::from_millis(20),
        Duration::from_millis(20),
        Duration::from_millis(20),
    );

    runner.request_skill_learning("learn to fetch urls").unwrap();
    runner.start();
    tokio::time::sleep(Duration::from_millis(100)).await;
    runner.stop();
    assert!(!runner.is_running());

    // Grace period for any cycle already in flight at the stop signal,
    // then snapshot.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let status = runner.get_status();
    let entries = status["recent_activity"].as_array().unwrap().len();
    // The consolidation loop (interval zero) logged while running
    assert!(entries > 0);
    // With the completion service unreachable, the gap request survived
    assert_eq!(status["pending_skill_gaps"], json!(1));

    // Wait well past the poll interval: no loop appends anything more
    tokio::time::sleep(Duration::from_millis(100)).await;
    let later = runner.get_status();
    assert_eq!(later["recent_activity"].as_array().unwrap().len(), entries);
    assert_eq!(later["pending_skill_gaps"], json!(1));
}

#[tokio::test]
async fn session_shutdown_event_stops_autonomy() {
    let orch = make_orchestrator(Arc::new(MemoryStore::in_memory()));
    assert!(orch.is_alive());
    let outcome = orch.handle_event(&Event::bare(EventType::SystemShutdown)).await;
    assert!(outcome.is_done());
    assert!(!orch.is_alive());
}

#[tokio::test]
async fn state_survives_reopen() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("memory.json");

    {
        let memory = Arc::new(MemoryStore::open(&path).unwrap());
        let orch = make_orchestrator(Arc::clone(&memory));
        orch.handle_event(&Event::new(
            EventType::MemoryWrite,
            json!({ "text": "favorite color is green" }),
        ))
        .await;
        orch.dispatch(&TaskSpec::with_text("echo", "persist me")).await;
    }

    let memory = Arc::new(MemoryStore::open(&path).unwrap());
    assert_eq!(memory.list_len("user_memories"), 1);
    assert_eq!(memory.list_len(EVENT_LOG_KEY), 1);
    let memories = memory.recall("user_memories", Value::Null);
    assert_eq!(memories[0]["data"], "favorite color is green");
}

#[tokio::test]
async fn capability_request_reaches_gap_queue_end_to_end() {
    let memory = Arc::new(MemoryStore::in_memory());
    let orch = make_orchestrator(Arc::clone(&memory));

    orch.handle_event(&Event::user_input("can you teach yourself to search arxiv"))
        .await;

    let learner = SkillLearner::new(Arc::clone(&memory), unreachable_completion());
    assert_eq!(learner.pending_gaps(), 1);

    // Service down: the learning attempt requeues instead of dropping it
    let registry = SkillRegistry::new();
    let learned = learner.learn_one(&registry).await.unwrap();
    assert!(learned.is_none());
    assert_eq!(learner.pending_gaps(), 1);
}
