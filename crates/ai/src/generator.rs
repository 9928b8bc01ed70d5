//! Text-generation collaborator and its OpenAI-compatible client.

use async_trait::async_trait;
use neurocoach_core::Role;
use reqwest::{Client, ClientBuilder};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::config::GeneratorConfig;
use crate::error::{AiError, Result};

/// One message of a chat prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Author
    pub role: Role,
    /// Text
    pub content: String,
}

impl ChatMessage {
    /// System instruction.
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    /// User turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    /// Assistant turn.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Produces text from a chat prompt.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Complete the conversation and return the assistant's reply.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;
}

/// Client for OpenAI-compatible `/chat/completions` endpoints.
#[derive(Clone)]
pub struct OpenAiGenerator {
    /// HTTP client
    client: Client,

    /// Endpoint, model and sampling settings
    config: GeneratorConfig,
}

impl OpenAiGenerator {
    /// Create a client from configuration.
    pub fn new(config: GeneratorConfig) -> Self {
        Self {
            client: ClientBuilder::new()
                .timeout(std::time::Duration::from_secs(config.timeout_secs))
                .build()
                .unwrap_or_default(),
            config,
        }
    }

    /// Configuration in use.
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| AiError::NotConfigured("OPENAI_API_KEY is not set".to_string()))?;

        let payload = json!({
            "model": self.config.model,
            "messages": messages,
            "temperature": self.config.temperature,
        });

        debug!(model = %self.config.model, messages = messages.len(), "Requesting completion");

        let response = self
            .client
            .post(format!(
                "{}/chat/completions",
                self.config.base_url.trim_end_matches('/')
            ))
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::Status { status, body });
        }

        #[derive(Deserialize)]
        struct Response {
            choices: Vec<Choice>,
        }

        #[derive(Deserialize)]
        struct Choice {
            message: Message,
        }

        #[derive(Deserialize)]
        struct Message {
            content: Option<String>,
        }

        let data: Response = response.json().await?;
        data.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| AiError::Upstream("empty completion".to_string()))
    }
}

/// Generator that replays canned replies and records every prompt.
#[cfg(test)]
pub(crate) struct ScriptedGenerator {
    replies: std::sync::Mutex<std::collections::VecDeque<std::result::Result<String, String>>>,
    pub(crate) prompts: std::sync::Mutex<Vec<Vec<ChatMessage>>>,
}

#[cfg(test)]
impl ScriptedGenerator {
    pub(crate) fn new(replies: Vec<std::result::Result<&str, &str>>) -> Self {
        Self {
            replies: std::sync::Mutex::new(
                replies
                    .into_iter()
                    .map(|r| r.map(str::to_string).map_err(str::to_string))
                    .collect(),
            ),
            prompts: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[cfg(test)]
#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        self.prompts.lock().unwrap().push(messages.to_vec());
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(msg)) => Err(AiError::Upstream(msg)),
            None => Err(AiError::Upstream("script exhausted".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_serialize_in_chat_format() {
        let value = serde_json::to_value(ChatMessage::system("Be brief")).unwrap();
        assert_eq!(value, json!({ "role": "system", "content": "Be brief" }));
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_without_request() {
        let generator = OpenAiGenerator::new(GeneratorConfig::default());
        let err = generator
            .complete(&[ChatMessage::user("hello")])
            .await
            .unwrap_err();
        assert!(matches!(err, AiError::NotConfigured(_)));
    }
}
