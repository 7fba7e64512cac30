//! HTTP bridge transport.
//!
//! The chat client is driven by a separate browser-automation bridge that
//! exposes a small JSON API:
//!
//! - `POST {base}/send` `{contact, text, attachments}` -> `{ok, message_id?, error?}`
//! - `GET {base}/chats/{digits}/messages` -> `{ok, messages: [{id?, text, direction, timestamp?, status?}]}`
//! - `GET {base}/health`
//!
//! The bridge returns the rendered part of the chat on every poll. Messages
//! without a native ID get a derived one that survives scrolling (see
//! [`cursor::ChatCursor`]).

pub(crate) mod cursor;
pub(crate) mod send;
pub(crate) mod types;


use async_trait::async_trait;
use outreach_core::{
    config::TransportConfig,
    error::OutreachError,
    message::{ChatMessage, OutgoingMessage},
    traits::Transport,
    Contact,
};
use cursor::ChatCursor;
use send::{retry_send, sanitize_for_chat, split_message, MAX_MESSAGE_LEN};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info};
use types::{MessagesResponse, SendRequest};

/// Transport backed by the HTTP automation bridge.
pub struct BridgeTransport {
    config: TransportConfig,
    client: reqwest::Client,
    base_url: String,
    cursors: Mutex<HashMap<Contact, ChatCursor>>,
}

impl BridgeTransport {
    pub fn new(config: TransportConfig) -> Self {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        Self {
            config,
            client: reqwest::Client::new(),
            base_url,
            cursors: Mutex::new(HashMap::new()),
        }
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs)
    }
}

#[async_trait]
impl Transport for BridgeTransport {
    fn name(&self) -> &str {
        "bridge"
    }

    fn normalize(&self, raw: &str) -> Result<Contact, OutreachError> {
        Contact::parse(raw, &self.config.default_country_code)
    }

    async fn send(
        &self,
        contact: &Contact,
        message: &OutgoingMessage,
    ) -> Result<(), OutreachError> {
        let url = format!("{}/send", self.base_url);
        let text = sanitize_for_chat(&message.text);
        let mut attachments: Vec<String> = message
            .attachments
            .iter()
            .map(|p| p.to_string_lossy().to_string())
            .collect();

        if let Some(missing) = attachments
            .iter()
            .find(|p| !std::path::Path::new(p).exists())
        {
            return Err(OutreachError::Transport(format!(
                "attachment not found: {missing}"
            )));
        }

        // Attachments ride with the first chunk.
        for chunk in split_message(&text, MAX_MESSAGE_LEN) {
            let body = SendRequest {
                contact: contact.as_str(),
                text: chunk,
                attachments: std::mem::take(&mut attachments),
            };
            retry_send(&self.client, &url, &body, self.timeout()).await?;
        }

        debug!("bridge: sent {} chars to {contact}", text.len());
        Ok(())
    }

    async fn poll_inbox(&self, contact: &Contact) -> Result<Vec<ChatMessage>, OutreachError> {
        let url = format!("{}/chats/{}/messages", self.base_url, contact.digits());
        let resp = self
            .client
            .get(&url)
            .timeout(self.timeout())
            .send()
            .await
            .map_err(|e| OutreachError::Transport(format!("poll {contact} failed: {e}")))?;

        let status = resp.status();
        let body: MessagesResponse = resp.json().await.map_err(|e| {
            OutreachError::Transport(format!("poll {contact}: bad response ({status}): {e}"))
        })?;

        if !body.ok {
            return Err(OutreachError::Transport(format!(
                "poll {contact}: {}",
                body.error.unwrap_or_else(|| format!("bridge returned {status}"))
            )));
        }

        let mut cursors = self.cursors.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(cursors
            .entry(contact.clone())
            .or_default()
            .assign(body.messages))
    }

    async fn is_available(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        match self
            .client
            .get(&url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => true,
            Ok(resp) => {
                info!("bridge health check returned {}", resp.status());
                false
            }
            Err(e) => {
                info!("bridge unreachable at {}: {e}", self.base_url);
                false
            }
        }
    }
}
