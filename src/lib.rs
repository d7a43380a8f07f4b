//! Assistant Engine
//!
//! Local-first cognitive orchestration engine: a durable key/value memory
//! store, a typed event pipeline, a skill registry with runtime-learned
//! skills, intent and goal state, a bounded autonomy loop, and three
//! cancellable background workers.
//!
//! # Features
//!
//! - **Durable Memory**: single JSON document, atomic whole-file replace
//! - **Typed Events**: one dispatcher over seven event kinds
//! - **Skill Registry**: explicit registration, completion-backed learned skills
//! - **Override Commands**: typed user commands take priority over skills
//! - **Autonomy**: bounded reflect/reason/act cycle with intent reinforcement
//! - **Background Loops**: curiosity, consolidation, skill-gap learning
//!
//! # Architecture
//!
//! ```text
//! stdin ──► Event ──► Orchestrator ──► SkillRegistry ──► Outcome
//!                         │                  │
//!                         ├── Commands (overrides)
//!                         ├── Intent + Goals + Planner
//!                         ├── PromptAdapter (fragment)
//!                         └── MemoryStore (JSON file)
//!                                  ▲
//!          BackgroundRunner ───────┘
//!            ├── CuriosityLoop     (idle exploration)
//!            ├── MemoryConsolidator (summaries, insights, pruning)
//!            └── SkillLearner      (gap queue → new skills)
//! ```

pub mod autonomy;
pub mod background;
pub mod commands;
pub mod completion;
pub mod config;
pub mod consolidator;
pub mod curiosity;
pub mod events;
pub mod goals;
pub mod intent;
pub mod memory;
pub mod orchestrator;
pub mod planner;
pub mod prompt_adapt;
pub mod skills;

pub use autonomy::AutonomyLoop;
pub use background::BackgroundRunner;
pub use commands::{parse_override, OverrideCommand};
pub use completion::{ChatMessage, CompletionClient, CompletionConfig, CompletionError};
pub use config::EngineConfig;
pub use consolidator::{ConsolidationReport, MemoryConsolidator};
pub use curiosity::CuriosityLoop;
pub use events::{Event, EventLogEntry, EventType};
pub use goals::{Goal, GoalOutcome, GoalStore};
pub use intent::{Intent, IntentModel, IntentSource};
pub use memory::{MemoryRecord, MemoryStore};
pub use orchestrator::Orchestrator;
pub use planner::Planner;
pub use prompt_adapt::PromptAdapter;
pub use skills::{
    register_builtins, Outcome, SkillContext, SkillHandler, SkillLearner, SkillRegistry, Status,
    TaskSpec,
};
