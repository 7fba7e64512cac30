use crate::{
    contact::Contact,
    context::Context,
    error::OutreachError,
    lead::ContactInfo,
    message::{ChatMessage, OutgoingMessage, Reply},
};
use async_trait::async_trait;

/// Messaging transport: the automated messaging client session.
///
/// One transport is one logical chat cursor. Callers must not run two
/// operations on it concurrently; the gateway serializes all access.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Human-readable transport name.
    fn name(&self) -> &str;

    /// Canonicalize a raw phone string the way this transport addresses chats.
    fn normalize(&self, raw: &str) -> Result<Contact, OutreachError>;

    /// Open the chat with `contact` and send a message (with optional media).
    async fn send(&self, contact: &Contact, message: &OutgoingMessage)
        -> Result<(), OutreachError>;

    /// Return the full currently-rendered chat with `contact`, oldest first.
    async fn poll_inbox(&self, contact: &Contact) -> Result<Vec<ChatMessage>, OutreachError>;

    /// Check if the transport session is ready.
    async fn is_available(&self) -> bool;
}

/// Reply generator: turns a conversation into the next assistant message.
#[async_trait]
pub trait Responder: Send + Sync {
    /// Human-readable responder name.
    fn name(&self) -> &str;

    /// Produce a reply for `context`. Failures are recoverable.
    async fn generate_reply(&self, context: &Context) -> Result<Reply, OutreachError>;

    /// Check if the responder is configured and reachable.
    async fn is_available(&self) -> bool;
}

/// External contacts directory used to enrich leads.
#[async_trait]
pub trait ContactDirectory: Send + Sync {
    /// Look up display data for a contact. `Ok(None)` means no match.
    async fn lookup(&self, contact: &Contact) -> Result<Option<ContactInfo>, OutreachError>;
}
