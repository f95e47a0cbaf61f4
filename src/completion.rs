//! External completion service abstraction.
//!
//! Defines the [`CompletionClient`] trait and two implementations:
//! - **[`OpenAiClient`]** — calls an OpenAI-style `/v1/chat/completions`
//!   endpoint with text and inlined image parts.
//! - **[`DisabledClient`]** — used when no API key is present; reports
//!   itself unconfigured so the curator can take its degraded path.
//!
//! Every request carries a bounded timeout. There is no retry loop here:
//! the curator's fallback ladder is the availability mechanism, and a slow
//! external call must not hold the request open while the caller would
//! accept a random selection anyway.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::time::Duration;

use crate::config::CurationConfig;

/// One chat message: a role plus ordered text/image parts.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: &'static str,
    pub parts: Vec<MessagePart>,
}

#[derive(Debug, Clone)]
pub enum MessagePart {
    Text(String),
    ImageUrl(String),
}

impl ChatMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: "system",
            parts: vec![MessagePart::Text(text.into())],
        }
    }

    pub fn user(parts: Vec<MessagePart>) -> Self {
        Self {
            role: "user",
            parts,
        }
    }
}

/// A text/vision completion backend. Object-safe so tests can inject mocks
/// and the curator can hold it as a trait object.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Whether a credential is available. When false the curator skips the
    /// external call entirely.
    fn is_configured(&self) -> bool;

    /// Send the messages and return the model's free-form text answer.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;
}

// ============ OpenAI client ============

pub struct OpenAiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(config: &CurationConfig, api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    fn is_configured(&self) -> bool {
        true
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": messages.iter().map(message_to_json).collect::<Vec<_>>(),
        });

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("completion API error {}: {}", status, body_text);
        }

        let json: serde_json::Value = response.json().await?;
        extract_content(&json)
    }
}

/// Serialize a message in the chat-completions shape. A single text part
/// stays a plain string; anything else becomes a content-part array so
/// vision models receive the images.
fn message_to_json(message: &ChatMessage) -> serde_json::Value {
    if let [MessagePart::Text(text)] = message.parts.as_slice() {
        return serde_json::json!({ "role": message.role, "content": text });
    }

    let content: Vec<serde_json::Value> = message
        .parts
        .iter()
        .map(|part| match part {
            MessagePart::Text(text) => serde_json::json!({ "type": "text", "text": text }),
            MessagePart::ImageUrl(url) => {
                serde_json::json!({ "type": "image_url", "image_url": { "url": url } })
            }
        })
        .collect();

    serde_json::json!({ "role": message.role, "content": content })
}

/// Pull the first choice's message text out of a chat-completions response.
fn extract_content(json: &serde_json::Value) -> Result<String> {
    let content = json
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .ok_or_else(|| anyhow::anyhow!("Invalid completion response: missing message content"))?;

    Ok(content.to_string())
}

// ============ Disabled client ============

/// Stand-in when `OPENAI_API_KEY` is absent. Never called by the curator
/// (the credential check short-circuits first), but completes the trait.
pub struct DisabledClient;

#[async_trait]
impl CompletionClient for DisabledClient {
    fn is_configured(&self) -> bool {
        false
    }

    async fn complete(&self, _messages: &[ChatMessage]) -> Result<String> {
        bail!("completion client is not configured")
    }
}

/// Pick the client implementation from the environment: a non-empty
/// `OPENAI_API_KEY` selects the real client, anything else the disabled one.
pub fn create_client(config: &CurationConfig) -> Result<Box<dyn CompletionClient>> {
    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if !key.trim().is_empty() => Ok(Box::new(OpenAiClient::new(config, key)?)),
        _ => Ok(Box::new(DisabledClient)),
    }
}
