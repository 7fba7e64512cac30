//! Bridge wire types.

use outreach_core::message::{Direction, Receipt};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub(crate) struct SendRequest<'a> {
    pub contact: &'a str,
    pub text: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SendResponse {
    pub ok: bool,
    #[allow(dead_code)]
    pub message_id: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MessagesResponse {
    pub ok: bool,
    #[serde(default)]
    pub messages: Vec<BridgeMessage>,
    pub error: Option<String>,
}

/// One rendered chat bubble as scraped by the bridge.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct BridgeMessage {
    /// Native message ID, when the client exposes one.
    pub id: Option<String>,
    #[serde(default)]
    pub text: String,
    pub direction: Direction,
    /// Rendered timestamp text (e.g. "10:42"), when visible.
    pub timestamp: Option<String>,
    /// Check marks on an outbound bubble.
    #[serde(default)]
    pub status: Option<Receipt>,
}
