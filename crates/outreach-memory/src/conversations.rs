//! Per-contact transcripts, capped to the most recent turns.

use outreach_core::{
    context::{Role, Turn},
    Contact,
};
use std::collections::{HashMap, VecDeque};

/// In-memory conversation history keyed by contact.
#[derive(Debug)]
pub struct ConversationStore {
    cap: usize,
    conversations: HashMap<Contact, VecDeque<Turn>>,
}

impl ConversationStore {
    pub fn new(cap: usize) -> Self {
        Self {
            cap: cap.max(1),
            conversations: HashMap::new(),
        }
    }

    /// Start an empty conversation, discarding any previous one.
    pub fn reset(&mut self, contact: &Contact) {
        self.conversations.insert(contact.clone(), VecDeque::new());
    }

    /// Append a turn, evicting the oldest turns beyond the cap.
    pub fn append(&mut self, contact: &Contact, role: Role, text: &str) {
        let turns = self.conversations.entry(contact.clone()).or_default();
        turns.push_back(Turn {
            role,
            text: text.to_string(),
        });
        while turns.len() > self.cap {
            turns.pop_front();
        }
    }

    /// Full retained history, oldest first. Empty for unknown contacts.
    pub fn history(&self, contact: &Contact) -> Vec<Turn> {
        self.conversations
            .get(contact)
            .map(|t| t.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// The last `n` turns, oldest first.
    pub fn recent(&self, contact: &Contact, n: usize) -> Vec<Turn> {
        match self.conversations.get(contact) {
            Some(turns) => turns.iter().skip(turns.len().saturating_sub(n)).cloned().collect(),
            None => Vec::new(),
        }
    }

    pub fn contains(&self, contact: &Contact) -> bool {
        self.conversations.contains_key(contact)
    }

    /// Number of conversations held.
    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    pub fn remove(&mut self, contact: &Contact) {
        self.conversations.remove(contact);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact() -> Contact {
        Contact::from_canonical("+966501234567")
    }

    #[test]
    fn test_append_and_history() {
        let mut store = ConversationStore::new(20);
        store.reset(&contact());
        store.append(&contact(), Role::Assistant, "Offer: 3-pack for 99 SAR");
        store.append(&contact(), Role::Customer, "How much for one?");
        let history = store.history(&contact());
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::Assistant);
        assert_eq!(history[1].text, "How much for one?");
    }

    #[test]
    fn test_cap_keeps_most_recent() {
        let mut store = ConversationStore::new(20);
        for i in 0..25 {
            store.append(&contact(), Role::Customer, &format!("turn {i}"));
        }
        let history = store.history(&contact());
        assert_eq!(history.len(), 20);
        assert_eq!(history[0].text, "turn 5");
        assert_eq!(history[19].text, "turn 24");
    }

    #[test]
    fn test_reset_discards_previous() {
        let mut store = ConversationStore::new(20);
        store.append(&contact(), Role::Customer, "old");
        store.reset(&contact());
        assert!(store.contains(&contact()));
        assert!(store.history(&contact()).is_empty());
    }

    #[test]
    fn test_recent() {
        let mut store = ConversationStore::new(20);
        for i in 0..5 {
            store.append(&contact(), Role::Customer, &format!("t{i}"));
        }
        let recent = store.recent(&contact(), 2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].text, "t3");
        assert_eq!(store.recent(&contact(), 10).len(), 5);
        assert!(store.recent(&Contact::from_canonical("+10000000000"), 3).is_empty());
    }

    #[test]
    fn test_unknown_contact_history_is_empty() {
        let store = ConversationStore::new(20);
        assert!(store.history(&contact()).is_empty());
        assert!(store.is_empty());
    }
}
