//! Message ledger: which inbound messages each contact has already had handled.
//!
//! Transports return the whole rendered chat on every poll, so "new" means
//! "not yet in this contact's seen set". Identifiers are retained up to a cap
//! (oldest evicted first); the cap is raised to the largest snapshot seen for
//! the contact so visible history can never fall out of the set.

use outreach_core::{message::ChatMessage, Contact};
use std::collections::{HashMap, HashSet, VecDeque};

#[derive(Debug, Default)]
struct LedgerEntry {
    seen: HashSet<String>,
    /// Insertion order of `seen`, oldest first.
    order: VecDeque<String>,
    /// Effective retention: max(cap, largest snapshot observed).
    retain: usize,
    initialized: bool,
}

impl LedgerEntry {
    fn new(cap: usize) -> Self {
        Self {
            retain: cap,
            ..Default::default()
        }
    }

    fn insert(&mut self, id: &str) {
        if !self.seen.insert(id.to_string()) {
            return;
        }
        self.order.push_back(id.to_string());
        while self.order.len() > self.retain {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }
    }

    fn observe_snapshot(&mut self, len: usize) {
        if len > self.retain {
            self.retain = len;
        }
    }
}

/// Per-contact sets of seen message identifiers.
#[derive(Debug)]
pub struct MessageLedger {
    cap: usize,
    entries: HashMap<Contact, LedgerEntry>,
}

impl MessageLedger {
    pub fn new(cap: usize) -> Self {
        Self {
            cap: cap.max(1),
            entries: HashMap::new(),
        }
    }

    fn entry(&mut self, contact: &Contact) -> &mut LedgerEntry {
        let cap = self.cap;
        self.entries
            .entry(contact.clone())
            .or_insert_with(|| LedgerEntry::new(cap))
    }

    /// Record `message_id` as handled. Idempotent.
    pub fn mark_seen(&mut self, contact: &Contact, message_id: &str) {
        self.entry(contact).insert(message_id);
    }

    /// Return the messages of `candidates` whose IDs are not yet seen, in input order.
    ///
    /// `candidates` is the full visible snapshot (already-read history
    /// included). Repeated IDs within the snapshot are returned once. Nothing
    /// is marked seen here; callers mark each message as they handle it.
    pub fn filter_new(&mut self, contact: &Contact, candidates: &[ChatMessage]) -> Vec<ChatMessage> {
        let entry = self.entry(contact);
        entry.observe_snapshot(candidates.len());

        let mut returned: HashSet<&str> = HashSet::new();
        candidates
            .iter()
            .filter(|m| !entry.seen.contains(&m.id) && returned.insert(m.id.as_str()))
            .cloned()
            .collect()
    }

    /// Mark every message of the current snapshot as seen without returning any.
    ///
    /// Called when monitoring starts for a contact so historical messages are
    /// never answered as if new. Calling it again only adds IDs.
    pub fn initialize(&mut self, contact: &Contact, snapshot: &[ChatMessage]) {
        let entry = self.entry(contact);
        entry.observe_snapshot(snapshot.len());
        for msg in snapshot {
            entry.insert(&msg.id);
        }
        entry.initialized = true;
    }

    /// Whether [`initialize`](Self::initialize) has run for this contact.
    pub fn is_initialized(&self, contact: &Contact) -> bool {
        self.entries
            .get(contact)
            .map(|e| e.initialized)
            .unwrap_or(false)
    }

    pub fn is_seen(&self, contact: &Contact, message_id: &str) -> bool {
        self.entries
            .get(contact)
            .map(|e| e.seen.contains(message_id))
            .unwrap_or(false)
    }

    /// Number of IDs currently retained for a contact.
    pub fn seen_count(&self, contact: &Contact) -> usize {
        self.entries.get(contact).map(|e| e.seen.len()).unwrap_or(0)
    }

    /// Drop all state for a contact.
    pub fn forget(&mut self, contact: &Contact) {
        self.entries.remove(contact);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use outreach_core::message::Direction;

    fn contact() -> Contact {
        Contact::from_canonical("+966501234567")
    }

    fn msg(id: &str) -> ChatMessage {
        ChatMessage::new(id, format!("text of {id}"), Direction::In)
    }

    #[test]
    fn test_initialize_then_filter_is_empty() {
        let mut ledger = MessageLedger::new(100);
        let snapshot = vec![msg("a"), msg("b"), msg("c")];
        ledger.initialize(&contact(), &snapshot);
        assert!(ledger.filter_new(&contact(), &snapshot).is_empty());
        assert!(ledger.filter_new(&contact(), &snapshot).is_empty());
        assert!(ledger.is_initialized(&contact()));
    }

    #[test]
    fn test_filter_preserves_order() {
        let mut ledger = MessageLedger::new(100);
        ledger.initialize(&contact(), &[msg("old")]);
        let snapshot = vec![msg("old"), msg("m1"), msg("m2"), msg("m3")];
        let ids: Vec<_> = ledger
            .filter_new(&contact(), &snapshot)
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, vec!["m1", "m2", "m3"]);
    }

    #[test]
    fn test_filter_does_not_mark() {
        let mut ledger = MessageLedger::new(100);
        let snapshot = vec![msg("m1")];
        assert_eq!(ledger.filter_new(&contact(), &snapshot).len(), 1);
        assert_eq!(ledger.filter_new(&contact(), &snapshot).len(), 1);
        ledger.mark_seen(&contact(), "m1");
        assert!(ledger.filter_new(&contact(), &snapshot).is_empty());
    }

    #[test]
    fn test_duplicate_ids_in_snapshot() {
        let mut ledger = MessageLedger::new(100);
        let snapshot = vec![msg("a"), msg("a"), msg("b")];
        let new = ledger.filter_new(&contact(), &snapshot);
        assert_eq!(new.len(), 2);

        ledger.initialize(&contact(), &snapshot);
        assert_eq!(ledger.seen_count(&contact()), 2);
    }

    #[test]
    fn test_empty_snapshot_is_noop() {
        let mut ledger = MessageLedger::new(100);
        ledger.initialize(&contact(), &[]);
        assert_eq!(ledger.seen_count(&contact()), 0);
        assert!(ledger.filter_new(&contact(), &[]).is_empty());
    }

    #[test]
    fn test_mark_seen_idempotent() {
        let mut ledger = MessageLedger::new(100);
        ledger.mark_seen(&contact(), "x");
        ledger.mark_seen(&contact(), "x");
        assert_eq!(ledger.seen_count(&contact()), 1);
    }

    #[test]
    fn test_initialize_twice_is_harmless() {
        let mut ledger = MessageLedger::new(100);
        let snapshot = vec![msg("a"), msg("b")];
        ledger.initialize(&contact(), &snapshot);
        ledger.initialize(&contact(), &snapshot);
        assert_eq!(ledger.seen_count(&contact()), 2);
        assert!(ledger.filter_new(&contact(), &snapshot).is_empty());
    }

    #[test]
    fn test_eviction_drops_oldest() {
        let mut ledger = MessageLedger::new(3);
        for id in ["a", "b", "c", "d"] {
            ledger.mark_seen(&contact(), id);
        }
        assert_eq!(ledger.seen_count(&contact()), 3);
        assert!(!ledger.is_seen(&contact(), "a"));
        assert!(ledger.is_seen(&contact(), "d"));
    }

    #[test]
    fn test_large_snapshot_raises_retention() {
        let mut ledger = MessageLedger::new(3);
        let snapshot: Vec<_> = (0..10).map(|i| msg(&format!("h{i}"))).collect();
        ledger.initialize(&contact(), &snapshot);
        assert_eq!(ledger.seen_count(&contact()), 10);
        assert!(ledger.filter_new(&contact(), &snapshot).is_empty());
    }

    #[test]
    fn test_contacts_are_independent() {
        let mut ledger = MessageLedger::new(100);
        let other = Contact::from_canonical("+33631055810");
        ledger.initialize(&contact(), &[msg("a")]);
        assert_eq!(ledger.filter_new(&other, &[msg("a")]).len(), 1);
        assert!(!ledger.is_initialized(&other));

        ledger.forget(&contact());
        assert!(!ledger.is_initialized(&contact()));
    }
}
