//! Completion Service Client
//!
//! Thin HTTP client for a locally hosted text-completion service
//! (Ollama-style API). The engine treats the model as an opaque
//! collaborator: every call has a bounded timeout and callers degrade to
//! "no result this cycle" on failure instead of propagating the error.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Errors talking to the completion service
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("completion request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("completion service returned {status}: {body}")]
    Service {
        status: reqwest::StatusCode,
        body: String,
    },
}

/// Completion client configuration
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: std::env::var("COMPLETION_URL")
                .unwrap_or_else(|_| "http://localhost:11434".to_string()),
            model: std::env::var("COMPLETION_MODEL")
                .unwrap_or_else(|_| "llama3.1:8b".to_string()),
            timeout: Duration::from_secs(30),
        }
    }
}

/// A chat message for the conversational endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: &str) -> Self {
        Self { role: "user".to_string(), content: content.to_string() }
    }

    pub fn system(content: &str) -> Self {
        Self { role: "system".to_string(), content: content.to_string() }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// HTTP client for the text-completion collaborator
pub struct CompletionClient {
    config: CompletionConfig,
    client: reqwest::Client,
}

impl CompletionClient {
    pub fn new() -> Result<Self, CompletionError> {
        Self::with_config(CompletionConfig::default())
    }

    pub fn with_config(config: CompletionConfig) -> Result<Self, CompletionError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self { config, client })
    }

    /// Check if the service answers at all (short probe timeout)
    pub async fn is_available(&self) -> bool {
        match self
            .client
            .get(format!("{}/api/tags", self.config.base_url))
            .timeout(Duration::from_secs(2))
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    /// Single-prompt text generation
    pub async fn generate(&self, prompt: &str) -> Result<String, CompletionError> {
        let url = format!("{}/api/generate", self.config.base_url);

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({
                "model": self.config.model,
                "prompt": prompt,
                "stream": false,
                "options": {
                    "temperature": 0.3,
                }
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Service { status, body });
        }

        let result: GenerateResponse = response.json().await?;
        Ok(result.response.trim().to_string())
    }

    /// Multi-turn chat completion
    pub async fn chat(&self, messages: &[ChatMessage]) -> Result<String, CompletionError> {
        let url = format!("{}/api/chat", self.config.base_url);

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({
                "model": self.config.model,
                "messages": messages,
                "stream": false,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Service { status, body });
        }

        let result: ChatResponse = response.json().await?;
        Ok(result.message.content.trim().to_string())
    }

    /// Degrading wrapper: None on any failure, with a warning logged.
    /// Background loops use this so a dead model never stops a scheduler.
    pub async fn generate_or_none(&self, prompt: &str) -> Option<String> {
        match self.generate(prompt).await {
            Ok(text) if !text.is_empty() => Some(text),
            Ok(_) => None,
            Err(e) => {
                warn!("Completion unavailable: {e:#}");
                None
            }
        }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_service_degrades() {
        let client = CompletionClient::with_config(CompletionConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            model: "test".to_string(),
            timeout: Duration::from_secs(1),
        })
        .unwrap();

        assert!(!client.is_available().await);
        assert!(client.generate("hello").await.is_err());
        assert!(client.generate_or_none("hello").await.is_none());
    }

    #[test]
    fn test_chat_message_roles() {
        let m = ChatMessage::user("hi");
        assert_eq!(m.role, "user");
        let s = ChatMessage::system("be brief");
        assert_eq!(s.role, "system");
    }

    #[test]
    fn test_config_defaults() {
        let config = CompletionConfig::default();
        assert!(config.base_url.starts_with("http"));
        assert_eq!(config.timeout, Duration::from_secs(30));
    }
}
