//! Monitoring set and contact enrollment.

use super::Gateway;
use super::stats::ReceiptCounts;
use outreach_core::{
    context::Role,
    message::{ChatMessage, Direction, Receipt},
    Contact,
};
use outreach_memory::{ConversationStore, MessageLedger};
use std::collections::HashMap;
use std::sync::atomic::Ordering;
use tracing::{info, warn};

struct MonitoredContact {
    contact: Contact,
    paused: bool,
}

/// All mutable per-contact state, guarded by one lock.
pub(crate) struct MonitorState {
    pub(crate) ledger: MessageLedger,
    pub(crate) conversations: ConversationStore,
    /// Insertion order is the per-cycle processing order.
    contacts: Vec<MonitoredContact>,
    /// Receipts on our messages in each contact's latest snapshot.
    receipts: HashMap<Contact, ReceiptCounts>,
}

impl MonitorState {
    pub fn new(ledger_cap: usize, history_cap: usize) -> Self {
        Self {
            ledger: MessageLedger::new(ledger_cap),
            conversations: ConversationStore::new(history_cap),
            contacts: Vec::new(),
            receipts: HashMap::new(),
        }
    }

    pub fn is_monitored(&self, contact: &Contact) -> bool {
        self.contacts.iter().any(|m| m.contact == *contact)
    }

    /// Monitored and not paused.
    pub fn is_active(&self, contact: &Contact) -> bool {
        self.contacts
            .iter()
            .any(|m| m.contact == *contact && !m.paused)
    }

    /// Add an active contact. Returns `false` if it was already present.
    pub fn insert(&mut self, contact: Contact) -> bool {
        if self.is_monitored(&contact) {
            return false;
        }
        self.contacts.push(MonitoredContact {
            contact,
            paused: false,
        });
        true
    }

    /// Remove a contact and forget its ledger and conversation.
    pub fn remove(&mut self, contact: &Contact) -> bool {
        let before = self.contacts.len();
        self.contacts.retain(|m| m.contact != *contact);
        if self.contacts.len() == before {
            return false;
        }
        self.ledger.forget(contact);
        self.conversations.remove(contact);
        self.receipts.remove(contact);
        true
    }

    /// Count delivered and read check marks on our messages in `snapshot`.
    /// A read message is counted as read only.
    pub fn record_receipts(&mut self, contact: &Contact, snapshot: &[ChatMessage]) {
        let mut counts = ReceiptCounts::default();
        for msg in snapshot.iter().filter(|m| m.direction == Direction::Out) {
            match msg.receipt {
                Some(Receipt::Read) => counts.read += 1,
                Some(Receipt::Delivered) => counts.delivered += 1,
                Some(Receipt::Sent) | None => {}
            }
        }
        self.receipts.insert(contact.clone(), counts);
    }

    /// Receipt totals over all monitored contacts.
    pub fn receipt_totals(&self) -> ReceiptCounts {
        self.receipts
            .values()
            .fold(ReceiptCounts::default(), |acc, c| ReceiptCounts {
                delivered: acc.delivered + c.delivered,
                read: acc.read + c.read,
            })
    }

    /// Returns `false` when the contact is unknown or already in that state.
    pub fn set_paused(&mut self, contact: &Contact, paused: bool) -> bool {
        match self.contacts.iter_mut().find(|m| m.contact == *contact) {
            Some(m) if m.paused != paused => {
                m.paused = paused;
                true
            }
            _ => false,
        }
    }

    pub fn active_contacts(&self) -> Vec<Contact> {
        self.contacts
            .iter()
            .filter(|m| !m.paused)
            .map(|m| m.contact.clone())
            .collect()
    }

    pub fn contacts(&self) -> Vec<(Contact, bool)> {
        self.contacts
            .iter()
            .map(|m| (m.contact.clone(), m.paused))
            .collect()
    }

    pub fn monitored_count(&self) -> usize {
        self.contacts.len()
    }
}

impl Gateway {
    /// Start monitoring a contact: reset its conversation, record the offer
    /// that was just sent as the first assistant turn, and mark the current
    /// chat snapshot as seen.
    ///
    /// The caller must hold the transport lock. Returns `false` if the
    /// contact was already monitored. When the snapshot poll fails the
    /// ledger stays uninitialized and the next cycle initializes it without
    /// answering anything.
    pub(crate) async fn enroll(&self, contact: &Contact, initial_offer: Option<&str>) -> bool {
        {
            let mut state = self.state.lock().await;
            if !state.insert(contact.clone()) {
                return false;
            }
            state.conversations.reset(contact);
            if let Some(offer) = initial_offer {
                state.conversations.append(contact, Role::Assistant, offer);
            }
        }

        match self.transport.poll_inbox(contact).await {
            Ok(snapshot) => {
                let mut state = self.state.lock().await;
                // Removed while polling.
                if !state.is_monitored(contact) {
                    return true;
                }
                state.ledger.initialize(contact, &snapshot);
                state.record_receipts(contact, &snapshot);
                info!(
                    "monitoring: added {contact} ({} historical messages marked seen)",
                    snapshot.len()
                );
            }
            Err(e) => {
                self.stats.poll_failures.fetch_add(1, Ordering::Relaxed);
                warn!("monitoring: added {contact}, initial snapshot failed: {e}");
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn out(id: &str, receipt: Option<Receipt>) -> ChatMessage {
        ChatMessage {
            receipt,
            ..ChatMessage::new(id, "offer", Direction::Out)
        }
    }

    #[test]
    fn test_receipts_counted_per_latest_snapshot() {
        let a = Contact::from_canonical("+966501234567");
        let b = Contact::from_canonical("+966509876543");
        let mut state = MonitorState::new(100, 20);
        state.insert(a.clone());
        state.insert(b.clone());

        state.record_receipts(
            &a,
            &[
                out("1", Some(Receipt::Read)),
                out("2", Some(Receipt::Delivered)),
                out("3", Some(Receipt::Sent)),
                ChatMessage::new("4", "hi", Direction::In),
            ],
        );
        state.record_receipts(&b, &[out("5", Some(Receipt::Delivered))]);
        assert_eq!(state.receipt_totals(), ReceiptCounts { delivered: 2, read: 1 });

        // The next poll replaces the contact's counts.
        state.record_receipts(&b, &[out("5", Some(Receipt::Read))]);
        assert_eq!(state.receipt_totals(), ReceiptCounts { delivered: 1, read: 2 });

        state.remove(&a);
        assert_eq!(state.receipt_totals(), ReceiptCounts { delivered: 0, read: 1 });
    }
}
