//! Skill System
//!
//! Named actions with a uniform invoke/result contract:
//! - Typed outcomes and the handler trait
//! - Explicit registry constructed at startup (no global singleton)
//! - Built-in skills the planner targets
//! - Gap detection and completion-backed skill synthesis

mod builtin;
mod learner;
mod registry;
mod types;

pub use builtin::register_builtins;
pub use learner::{SkillLearner, GAP_QUEUE_KEY, SKILL_LEARNINGS_KEY};
pub use registry::{SkillEntry, SkillRegistry};
pub use types::{Outcome, SkillContext, SkillHandler, Status, TaskSpec};
