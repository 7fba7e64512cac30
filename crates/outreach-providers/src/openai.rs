//! OpenAI-compatible chat completions responder.
//!
//! Works with OpenAI's API and any compatible endpoint. A reply that stopped
//! on the output-token limit (`finish_reason == "length"`) is flagged as
//! truncated so the gateway can ask for a continuation.

use async_trait::async_trait;
use outreach_core::{
    config::ResponderConfig,
    context::{ApiMessage, Context},
    error::OutreachError,
    message::{Reply, ReplyMetadata},
    traits::Responder,
};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// OpenAI-compatible responder.
pub struct OpenAiResponder {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    timeout: Duration,
}

impl OpenAiResponder {
    pub fn from_config(config: &ResponderConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

/// Build OpenAI-format messages from context (system as a message role).
pub(crate) fn build_openai_messages(system: &str, api_messages: &[ApiMessage]) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(api_messages.len() + 1);
    if !system.is_empty() {
        messages.push(ChatMessage {
            role: "system".to_string(),
            content: system.to_string(),
        });
    }
    messages.extend(api_messages.iter().map(|m| ChatMessage {
        role: m.role.clone(),
        content: m.content.clone(),
    }));
    messages
}

#[derive(Serialize, Deserialize, Clone)]
pub(crate) struct ChatMessage {
    pub role: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Serialize)]
pub(crate) struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Deserialize)]
pub(crate) struct ChatCompletionResponse {
    pub choices: Option<Vec<ChatChoice>>,
    pub model: Option<String>,
    pub usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
pub(crate) struct ChatChoice {
    pub message: Option<ChatMessage>,
    pub finish_reason: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct ChatUsage {
    pub total_tokens: Option<u64>,
}

#[async_trait]
impl Responder for OpenAiResponder {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate_reply(&self, context: &Context) -> Result<Reply, OutreachError> {
        if self.api_key.is_empty() {
            return Err(OutreachError::Responder("openai: no API key configured".into()));
        }

        let (system, api_messages) = context.to_api_messages();
        let start = Instant::now();

        let body = ChatCompletionRequest {
            model: self.model.clone(),
            messages: build_openai_messages(&system, &api_messages),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let url = format!("{}/chat/completions", self.base_url);
        debug!("openai: POST {url} model={}", self.model);

        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| OutreachError::Responder(format!("openai request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(OutreachError::Responder(format!(
                "openai returned {status}: {text}"
            )));
        }

        let parsed: ChatCompletionResponse = resp.json().await.map_err(|e| {
            OutreachError::Responder(format!("openai: failed to parse response: {e}"))
        })?;

        let choice = parsed
            .choices
            .as_ref()
            .and_then(|c| c.first())
            .ok_or_else(|| OutreachError::Responder("openai: response has no choices".into()))?;

        let text = choice
            .message
            .as_ref()
            .map(|m| m.content.trim().to_string())
            .unwrap_or_default();
        if text.is_empty() {
            return Err(OutreachError::Responder("openai: empty reply".into()));
        }

        let truncated = choice.finish_reason.as_deref() == Some("length");
        if truncated {
            debug!("openai: reply hit max_tokens ({})", self.max_tokens);
        }

        Ok(Reply {
            text,
            truncated,
            metadata: ReplyMetadata {
                provider_used: "openai".to_string(),
                tokens_used: parsed.usage.as_ref().and_then(|u| u.total_tokens),
                processing_time_ms: start.elapsed().as_millis() as u64,
                model: parsed.model.clone(),
            },
        })
    }

    async fn is_available(&self) -> bool {
        if self.api_key.is_empty() {
            warn!("openai: no API key configured");
            return false;
        }
        let url = format!("{}/models", self.base_url);
        match self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .timeout(self.timeout)
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                warn!("openai not available: {e}");
                false
            }
        }
    }
}
