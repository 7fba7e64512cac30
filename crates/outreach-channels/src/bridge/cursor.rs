//! Stable identity for chat bubbles that carry no native ID.
//!
//! The bridge renders only the tail of a chat, so counting occurrences of a
//! text within one snapshot is not enough: once an older "ok" scrolls out of
//! view, a new "ok" would inherit its position and its ID. Instead every poll
//! is aligned against the previous snapshot of the same chat. Bubbles found
//! there keep their IDs; the rest get an ID never handed out for this chat.

use super::types::BridgeMessage;
use outreach_core::message::{derive_message_id, ChatMessage, Direction};
use std::collections::HashMap;

/// What identifies a bubble from one poll to the next. Receipts change while a
/// message sits in the chat, so they are not part of it.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Fingerprint {
    native: Option<String>,
    text: String,
    direction: Direction,
    timestamp: Option<String>,
}

impl Fingerprint {
    fn of(m: &BridgeMessage) -> Self {
        Self {
            native: m.id.clone().filter(|id| !id.trim().is_empty()),
            text: m.text.clone(),
            direction: m.direction,
            timestamp: m.timestamp.clone(),
        }
    }
}

/// Identity state for one chat.
#[derive(Debug, Default)]
pub(crate) struct ChatCursor {
    /// The previous snapshot with the IDs it was given.
    window: Vec<(Fingerprint, String)>,
    /// Derived IDs handed out so far, per `(text, timestamp)`.
    minted: HashMap<(String, Option<String>), usize>,
}

impl ChatCursor {
    /// Convert a snapshot into chat messages, oldest first.
    pub fn assign(&mut self, raw: Vec<BridgeMessage>) -> Vec<ChatMessage> {
        let prints: Vec<Fingerprint> = raw.iter().map(Fingerprint::of).collect();
        let old: Vec<&Fingerprint> = self.window.iter().map(|(p, _)| p).collect();
        let matched = align(&old, &prints);

        let mut window = Vec::with_capacity(raw.len());
        let mut messages = Vec::with_capacity(raw.len());
        for ((m, print), prev) in raw.into_iter().zip(prints).zip(matched) {
            let id = match (&print.native, prev) {
                (Some(native), _) => native.clone(),
                (None, Some(i)) => self.window[i].1.clone(),
                (None, None) => self.mint(&print),
            };
            window.push((print, id.clone()));
            messages.push(ChatMessage {
                id,
                text: m.text,
                direction: m.direction,
                receipt: m.status,
            });
        }
        self.window = window;
        messages
    }

    fn mint(&mut self, print: &Fingerprint) -> String {
        let n = self
            .minted
            .entry((print.text.clone(), print.timestamp.clone()))
            .or_insert(0);
        let occurrence = *n;
        *n += 1;
        match print.timestamp.as_deref() {
            // Same text at the same rendered time: keep them apart.
            Some(ts) if occurrence > 0 => {
                derive_message_id(&print.text, Some(&format!("{ts}#{occurrence}")), 0)
            }
            ts => derive_message_id(&print.text, ts, occurrence),
        }
    }
}

/// For each bubble of `new`, the index of the same bubble in `old`, if any.
///
/// The common case is a window that grew at the bottom or slid forward: the
/// longest tail of `old` that `new` starts with. Anything else (a deleted
/// bubble, history loaded above) falls back to a longest common subsequence.
fn align(old: &[&Fingerprint], new: &[Fingerprint]) -> Vec<Option<usize>> {
    for start in 0..old.len() {
        let overlap = (old.len() - start).min(new.len());
        if overlap > 0 && old[start..start + overlap].iter().zip(new).all(|(a, b)| *a == b) {
            return (0..new.len())
                .map(|j| (j < overlap).then_some(start + j))
                .collect();
        }
    }
    common_subsequence(old, new)
}

fn common_subsequence(old: &[&Fingerprint], new: &[Fingerprint]) -> Vec<Option<usize>> {
    let (n, m) = (old.len(), new.len());
    // lcs[i][j]: length of the LCS of old[i..] and new[j..].
    let mut lcs = vec![vec![0usize; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[i][j] = if *old[i] == new[j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }

    let mut matched = vec![None; m];
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if *old[i] == new[j] {
            matched[j] = Some(i);
            i += 1;
            j += 1;
        } else if lcs[i + 1][j] >= lcs[i][j + 1] {
            i += 1;
        } else {
            j += 1;
        }
    }
    matched
}
