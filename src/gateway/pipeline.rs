//! Inbound pipeline: new message → responder → lead extraction → send → record.

use super::Gateway;
use crate::markers::{
    extract_lead, join_continuation, looks_incomplete, trim_to_last_sentence, LeadMarker,
};
use outreach_core::{
    context::{Context, Role},
    error::OutreachError,
    message::{ChatMessage, OutgoingMessage},
    Contact,
};
use outreach_memory::{DeliveryEntry, DeliveryKind, DeliveryStatus};
use std::sync::atomic::Ordering;
use tracing::{debug, error, info, warn};

/// Reply ready to send: the text the customer sees plus the lead signal, if any.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ComposedReply {
    pub visible: String,
    pub lead: Option<LeadMarker>,
}

impl Gateway {
    /// Poll one contact and answer every new inbound message, oldest first.
    ///
    /// Returns the number of inbound messages handled. Only the poll itself
    /// can fail; responder and send failures are recovered per message.
    pub(super) async fn process_contact(&self, contact: &Contact) -> Result<usize, OutreachError> {
        let snapshot = self.transport.poll_inbox(contact).await?;

        let inbound: Vec<ChatMessage> = {
            let mut state = self.state.lock().await;
            // Removed while polling.
            if !state.is_monitored(contact) {
                return Ok(0);
            }
            state.record_receipts(contact, &snapshot);
            if !state.ledger.is_initialized(contact) {
                state.ledger.initialize(contact, &snapshot);
                debug!("monitoring: initialized ledger for {contact} from {} messages", snapshot.len());
                return Ok(0);
            }

            let mut inbound = Vec::new();
            for msg in state.ledger.filter_new(contact, &snapshot) {
                if msg.is_inbound() {
                    inbound.push(msg);
                } else {
                    // Our own sends showing up in the chat.
                    state.ledger.mark_seen(contact, &msg.id);
                }
            }
            inbound
        };

        for msg in &inbound {
            self.handle_inbound(contact, msg).await;
        }
        Ok(inbound.len())
    }

    /// Answer one inbound message and record the exchange.
    async fn handle_inbound(&self, contact: &Contact, msg: &ChatMessage) {
        info!("inbound from {contact}: {}", preview(&msg.text));

        let history = {
            let mut state = self.state.lock().await;
            // Removed earlier in this batch: its ledger is gone, leave it gone.
            if !state.is_monitored(contact) {
                debug!("monitoring: {contact} removed, dropping message {}", msg.id);
                return;
            }
            state.ledger.mark_seen(contact, &msg.id);
            state
                .conversations
                .recent(contact, self.settings.context_turns)
        };

        let context = Context::new(&self.settings.system_prompt, history, &msg.text);
        let reply = self.compose_reply(&context).await;

        let sent = if reply.visible.is_empty() {
            warn!("reply to {contact} is empty after marker removal, not sending");
            false
        } else {
            let outgoing = OutgoingMessage::text(reply.visible.clone());
            self.deliver(contact, &outgoing, DeliveryKind::Reply)
                .await
                .is_ok()
        };
        if sent {
            self.stats.replies_sent.fetch_add(1, Ordering::Relaxed);
            info!("replied to {contact}: {}", preview(&reply.visible));
        }

        {
            let mut state = self.state.lock().await;
            if state.is_monitored(contact) {
                state.conversations.append(contact, Role::Customer, &msg.text);
                if sent {
                    state
                        .conversations
                        .append(contact, Role::Assistant, &reply.visible);
                }
            }
        }

        if let Some(marker) = reply.lead {
            self.capture_lead(contact, &marker).await;
        }
    }

    /// Ask the responder for a reply, repairing replies that look cut off.
    ///
    /// A responder failure yields the fallback reply. A truncated or
    /// incomplete-looking reply gets one continuation request; if the result
    /// still looks incomplete, or the continuation fails, the text is trimmed
    /// back to its last complete sentence.
    pub(super) async fn compose_reply(&self, context: &Context) -> ComposedReply {
        let reply = match self.responder.generate_reply(context).await {
            Ok(reply) => reply,
            Err(e) => {
                self.stats.responder_failures.fetch_add(1, Ordering::Relaxed);
                warn!("responder failed, sending fallback reply: {e}");
                return ComposedReply {
                    visible: self.settings.fallback_reply.clone(),
                    lead: None,
                };
            }
        };

        let (visible, lead) = extract_lead(&reply.text);
        if !reply.truncated && !looks_incomplete(&visible) {
            return ComposedReply { visible, lead };
        }

        debug!(
            "reply looks cut off (truncated={}), requesting continuation",
            reply.truncated
        );
        match self
            .responder
            .generate_reply(&context.continuation(&reply.text))
            .await
        {
            Ok(cont) => {
                let joined = join_continuation(&reply.text, &cont.text);
                let (visible, lead) = extract_lead(&joined);
                let visible = if cont.truncated || looks_incomplete(&visible) {
                    trim_to_last_sentence(&visible)
                } else {
                    visible
                };
                ComposedReply { visible, lead }
            }
            Err(e) => {
                warn!("continuation failed, trimming reply: {e}");
                ComposedReply {
                    visible: trim_to_last_sentence(&visible),
                    lead,
                }
            }
        }
    }

    /// Send through the transport and record the outcome in the delivery log.
    pub(super) async fn deliver(
        &self,
        contact: &Contact,
        message: &OutgoingMessage,
        kind: DeliveryKind,
    ) -> Result<(), OutreachError> {
        let result = self.transport.send(contact, message).await;

        let (status, error_text) = match &result {
            Ok(()) => {
                self.stats.messages_sent.fetch_add(1, Ordering::Relaxed);
                (DeliveryStatus::Ok, None)
            }
            Err(e) => {
                self.stats.messages_failed.fetch_add(1, Ordering::Relaxed);
                error!("send to {contact} failed: {e}");
                (DeliveryStatus::Error, Some(e.to_string()))
            }
        };

        let entry = DeliveryEntry {
            contact: contact.clone(),
            kind,
            text: message.text.clone(),
            status,
            error: error_text,
        };
        if let Err(e) = self.deliveries.log(&entry).await {
            warn!("delivery log write failed: {e}");
        }

        result
    }
}

/// First line of a message, shortened for logs.
fn preview(text: &str) -> String {
    let line = text.lines().next().unwrap_or_default();
    match line.char_indices().nth(60) {
        Some((i, _)) => format!("{}...", &line[..i]),
        None => line.to_string(),
    }
}
