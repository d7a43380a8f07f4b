//! Prompt Adaptation
//!
//! Every successful exchange passes through here; turns that carry an
//! explicit durable instruction ("remember ...", "always ...") append a
//! line to the persisted system-prompt fragment. The fragment is capped
//! at a configurable byte size with oldest lines dropped first, so it
//! cannot grow without bound.

use crate::memory::MemoryStore;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

/// Memory key for the persisted system-prompt fragment
pub const PROMPT_FRAGMENT_KEY: &str = "system_prompt_fragment";

/// Cues that mark a turn as carrying a durable instruction
const INSTRUCTION_CUES: &[&str] = &["remember", "always", "never", "from now on"];

pub struct PromptAdapter {
    memory: Arc<MemoryStore>,
    max_bytes: usize,
}

impl PromptAdapter {
    pub fn new(memory: Arc<MemoryStore>, max_bytes: usize) -> Self {
        Self { memory, max_bytes }
    }

    /// Inspect one exchange and persist any durable instruction it carries
    pub fn observe_exchange(&self, user: &str, _reply: &str) -> anyhow::Result<()> {
        let lower = user.to_lowercase();
        if !INSTRUCTION_CUES.iter().any(|cue| lower.contains(cue)) {
            return Ok(());
        }

        let max_bytes = self.max_bytes;
        self.memory.update(PROMPT_FRAGMENT_KEY, json!(""), |v| {
            let current = v.as_str().unwrap_or("");
            let mut updated = if current.is_empty() {
                user.trim().to_string()
            } else {
                format!("{}\n{}", current, user.trim())
            };
            // Enforce the cap by dropping oldest lines
            while updated.len() > max_bytes {
                match updated.find('\n') {
                    Some(pos) => {
                        updated.drain(..=pos);
                    }
                    None => {
                        // One oversized line left: cut at the cap, backed
                        // off to a char boundary
                        let mut cut = max_bytes;
                        while !updated.is_char_boundary(cut) {
                            cut -= 1;
                        }
                        updated.truncate(cut);
                        break;
                    }
                }
            }
            *v = json!(updated);
        })?;

        debug!("Prompt fragment updated from user instruction");
        Ok(())
    }

    /// The accumulated fragment, empty string when none
    pub fn fragment(&self) -> String {
        self.memory
            .recall(PROMPT_FRAGMENT_KEY, Value::String(String::new()))
            .as_str()
            .unwrap_or("")
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_adapter(max_bytes: usize) -> PromptAdapter {
        PromptAdapter::new(Arc::new(MemoryStore::in_memory()), max_bytes)
    }

    #[test]
    fn test_instruction_turns_are_persisted() {
        let adapter = make_adapter(1024);
        adapter.observe_exchange("Remember I like strawberries", "Okay!").unwrap();
        adapter.observe_exchange("what time is it", "noon").unwrap();

        let fragment = adapter.fragment();
        assert!(fragment.contains("strawberries"));
        assert!(!fragment.contains("what time"));
    }

    #[test]
    fn test_fragment_growth_is_bounded() {
        let adapter = make_adapter(200);
        for i in 0..50 {
            adapter
                .observe_exchange(&format!("always do thing number {i}"), "ok")
                .unwrap();
        }
        let fragment = adapter.fragment();
        assert!(fragment.len() <= 200);
        // Newest instruction survives, oldest is gone
        assert!(fragment.contains("49"));
        assert!(!fragment.contains("thing number 0\n"));
    }

    #[test]
    fn test_fragment_empty_by_default() {
        let adapter = make_adapter(1024);
        assert_eq!(adapter.fragment(), "");
    }

    #[test]
    fn test_cap_inside_multibyte_char_does_not_panic() {
        // A 10-byte cap lands inside the two-byte "é" sequence; the cut
        // must back off to the previous char boundary.
        let adapter = make_adapter(10);
        adapter.observe_exchange("remember événement", "ok").unwrap();

        let fragment = adapter.fragment();
        assert!(fragment.len() <= 10);
        assert!(fragment.starts_with("remember"));
    }

    #[test]
    fn test_long_multibyte_line_stays_bounded() {
        let adapter = make_adapter(64);
        let line = format!("always répondez {}", "à".repeat(100));
        adapter.observe_exchange(&line, "ok").unwrap();
        assert!(adapter.fragment().len() <= 64);
    }
}
