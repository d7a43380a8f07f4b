//! Configuration management

use anyhow::Result;
use std::path::PathBuf;
use std::time::Duration;

/// Engine configuration, loaded from environment variables
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Path of the JSON memory file
    pub store_path: PathBuf,

    /// Completion service base URL
    pub completion_url: String,

    /// Completion model name
    pub completion_model: String,

    /// Per-call completion timeout
    pub completion_timeout: Duration,

    /// Poll interval of the curiosity loop
    pub curiosity_poll: Duration,

    /// Poll interval of the consolidation loop
    pub consolidation_poll: Duration,

    /// Poll interval of the skill-gap loop
    pub skill_poll: Duration,

    /// User inactivity required before curiosity activates
    pub idle_threshold: Duration,

    /// Minimum time between consolidation runs
    pub consolidation_interval: Duration,

    /// Autonomy loop cycle cap
    pub autonomy_max_cycles: u32,

    /// Event log retention (most recent entries kept by consolidation)
    pub event_log_cap: usize,

    /// Conversation log retention
    pub conversation_cap: usize,

    /// Insight list retention
    pub insight_cap: usize,

    /// Conversation summary window
    pub summary_cap: usize,

    /// Byte cap on the persisted system-prompt fragment
    pub prompt_fragment_max_bytes: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("assistant_memory.json"),
            completion_url: "http://localhost:11434".to_string(),
            completion_model: "llama3.1:8b".to_string(),
            completion_timeout: Duration::from_secs(30),
            curiosity_poll: Duration::from_secs(60),
            consolidation_poll: Duration::from_secs(300),
            skill_poll: Duration::from_secs(600),
            idle_threshold: Duration::from_secs(600),
            consolidation_interval: Duration::from_secs(3600),
            autonomy_max_cycles: 100,
            event_log_cap: 100,
            conversation_cap: 50,
            insight_cap: 20,
            summary_cap: 10,
            prompt_fragment_max_bytes: 8 * 1024,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let store_path = std::env::var("ENGINE_STORE_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.store_path);

        let completion_url =
            std::env::var("COMPLETION_URL").unwrap_or(defaults.completion_url);
        let completion_model =
            std::env::var("COMPLETION_MODEL").unwrap_or(defaults.completion_model);

        Ok(Self {
            store_path,
            completion_url,
            completion_model,
            completion_timeout: env_secs("COMPLETION_TIMEOUT_SECS", defaults.completion_timeout),
            curiosity_poll: env_secs("ENGINE_CURIOSITY_POLL_SECS", defaults.curiosity_poll),
            consolidation_poll: env_secs(
                "ENGINE_CONSOLIDATION_POLL_SECS",
                defaults.consolidation_poll,
            ),
            skill_poll: env_secs("ENGINE_SKILL_POLL_SECS", defaults.skill_poll),
            idle_threshold: env_secs("ENGINE_IDLE_THRESHOLD_SECS", defaults.idle_threshold),
            consolidation_interval: env_secs(
                "ENGINE_CONSOLIDATION_INTERVAL_SECS",
                defaults.consolidation_interval,
            ),
            autonomy_max_cycles: env_parse("ENGINE_AUTONOMY_MAX_CYCLES", defaults.autonomy_max_cycles),
            event_log_cap: env_parse("ENGINE_EVENT_LOG_CAP", defaults.event_log_cap),
            conversation_cap: env_parse("ENGINE_CONVERSATION_CAP", defaults.conversation_cap),
            insight_cap: env_parse("ENGINE_INSIGHT_CAP", defaults.insight_cap),
            summary_cap: env_parse("ENGINE_SUMMARY_CAP", defaults.summary_cap),
            prompt_fragment_max_bytes: env_parse(
                "ENGINE_PROMPT_FRAGMENT_MAX_BYTES",
                defaults.prompt_fragment_max_bytes,
            ),
        })
    }
}

fn env_secs(var: &str, default: Duration) -> Duration {
    std::env::var(var)
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}

fn env_parse<T: std::str::FromStr>(var: &str, default: T) -> T {
    std::env::var(var)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.event_log_cap, 100);
        assert_eq!(config.conversation_cap, 50);
        assert_eq!(config.consolidation_interval, Duration::from_secs(3600));
        assert_eq!(config.curiosity_poll, Duration::from_secs(60));
    }
}
