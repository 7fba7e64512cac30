use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;

/// Which side of the chat a message was written by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Written by the customer.
    In,
    /// Written by us (bulk offer or automated reply).
    Out,
}

/// Delivery state shown on an outbound bubble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Receipt {
    /// Single check: left the device.
    Sent,
    /// Double check: reached the customer's device.
    Delivered,
    /// Blue double check.
    Read,
}

/// One message as currently rendered in a chat.
///
/// A poll returns the full visible snapshot, not a delta: already-read
/// history resurfaces on every poll and must be filtered by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Stable identifier (native, or derived via [`derive_message_id`]).
    pub id: String,
    pub text: String,
    pub direction: Direction,
    /// Receipt of an outbound message, when the client renders one.
    #[serde(default)]
    pub receipt: Option<Receipt>,
}

impl ChatMessage {
    pub fn new(id: impl Into<String>, text: impl Into<String>, direction: Direction) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            direction,
            receipt: None,
        }
    }

    pub fn is_inbound(&self) -> bool {
        self.direction == Direction::In
    }
}

/// Outbound message: text plus optional media files sent with it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutgoingMessage {
    pub text: String,
    /// Local paths of images/videos/documents to attach.
    #[serde(default)]
    pub attachments: Vec<PathBuf>,
}

impl OutgoingMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            attachments: Vec::new(),
        }
    }
}

/// Raw output of the responder for one request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Reply {
    pub text: String,
    /// The backend stopped because it hit its output length limit.
    pub truncated: bool,
    pub metadata: ReplyMetadata,
}

/// Metadata about how a reply was generated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplyMetadata {
    /// Which responder produced this reply.
    pub provider_used: String,
    /// Token count (if available from the provider).
    pub tokens_used: Option<u64>,
    /// Wall-clock processing time in milliseconds.
    pub processing_time_ms: u64,
    /// Model identifier (if applicable).
    pub model: Option<String>,
}

/// Derive a stable message identifier for transports without native IDs.
///
/// Hashes the text with the rendered timestamp. When the transport exposes no
/// timestamp, the occurrence index of this exact text within the snapshot is
/// used instead, so two identical "ok" messages stay distinct while repeated
/// polls of the same chat produce the same IDs.
pub fn derive_message_id(text: &str, timestamp: Option<&str>, occurrence: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hasher.update([0u8]);
    match timestamp {
        Some(ts) => {
            hasher.update(b"ts:");
            hasher.update(ts.as_bytes());
        }
        None => {
            hasher.update(b"n:");
            hasher.update(occurrence.to_string().as_bytes());
        }
    }
    let digest = hasher.finalize();
    format!("fp:{}", hex::encode(&digest[..8]))
}
