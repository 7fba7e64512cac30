//! In-process fakes and a gateway harness shared by the gateway and control API tests.

use super::{Gateway, GatewaySettings, Pacing};
use async_trait::async_trait;
use outreach_core::{
    context::{Context, Turn},
    error::OutreachError,
    message::{ChatMessage, Direction, OutgoingMessage, Reply},
    traits::{ContactDirectory, Responder, Transport},
    Contact,
};
use outreach_memory::Store;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// In-process transport: scripted chat snapshots, recorded calls.
/// Successful sends show up in the chat as outbound messages.
#[derive(Default)]
pub(crate) struct FakeTransport {
    pub(crate) chats: std::sync::Mutex<HashMap<Contact, Vec<ChatMessage>>>,
    pub(crate) polls: std::sync::Mutex<Vec<Contact>>,
    pub(crate) sends: std::sync::Mutex<Vec<(Contact, OutgoingMessage)>>,
    pub(crate) failing_polls: std::sync::Mutex<HashSet<Contact>>,
    pub(crate) fail_sends: AtomicBool,
}

impl FakeTransport {
    pub(crate) fn push_inbound(&self, contact: &str, id: &str, text: &str) {
        self.chats
            .lock()
            .unwrap()
            .entry(Contact::from_canonical(contact))
            .or_default()
            .push(ChatMessage::new(id, text, Direction::In));
    }

    pub(crate) fn poll_count(&self) -> usize {
        self.polls.lock().unwrap().len()
    }

    pub(crate) fn polls_of(&self, contact: &str) -> usize {
        self.polls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.as_str() == contact)
            .count()
    }

    pub(crate) fn sent_texts(&self) -> Vec<String> {
        self.sends
            .lock()
            .unwrap()
            .iter()
            .map(|(_, m)| m.text.clone())
            .collect()
    }

    pub(crate) fn fail_polls_for(&self, contact: &str) {
        self.failing_polls
            .lock()
            .unwrap()
            .insert(Contact::from_canonical(contact));
    }
}

#[async_trait]
impl Transport for FakeTransport {
    fn name(&self) -> &str {
        "fake"
    }

    fn normalize(&self, raw: &str) -> Result<Contact, OutreachError> {
        Contact::parse(raw, "966")
    }

    async fn send(&self, contact: &Contact, message: &OutgoingMessage) -> Result<(), OutreachError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(OutreachError::Transport("chat failed to open".into()));
        }
        let mut sends = self.sends.lock().unwrap();
        sends.push((contact.clone(), message.clone()));
        self.chats
            .lock()
            .unwrap()
            .entry(contact.clone())
            .or_default()
            .push(ChatMessage::new(
                format!("out-{}", sends.len()),
                message.text.clone(),
                Direction::Out,
            ));
        Ok(())
    }

    async fn poll_inbox(&self, contact: &Contact) -> Result<Vec<ChatMessage>, OutreachError> {
        self.polls.lock().unwrap().push(contact.clone());
        if self.failing_polls.lock().unwrap().contains(contact) {
            return Err(OutreachError::Transport("poll timed out".into()));
        }
        Ok(self
            .chats
            .lock()
            .unwrap()
            .get(contact)
            .cloned()
            .unwrap_or_default())
    }

    async fn is_available(&self) -> bool {
        true
    }
}

/// Responder returning scripted replies, then a default one.
#[derive(Default)]
pub(crate) struct FakeResponder {
    script: std::sync::Mutex<VecDeque<Result<Reply, String>>>,
    contexts: std::sync::Mutex<Vec<Context>>,
    /// `(entered, release)` for the next call to block on.
    hold: std::sync::Mutex<Option<(Arc<Notify>, Arc<Notify>)>>,
}

impl FakeResponder {
    pub(crate) fn reply(&self, text: &str) {
        self.push(Ok(Reply {
            text: text.to_string(),
            ..Default::default()
        }));
    }

    pub(crate) fn truncated(&self, text: &str) {
        self.push(Ok(Reply {
            text: text.to_string(),
            truncated: true,
            ..Default::default()
        }));
    }

    pub(crate) fn fail(&self) {
        self.push(Err("quota exceeded".to_string()));
    }

    pub(crate) fn push(&self, item: Result<Reply, String>) {
        self.script.lock().unwrap().push_back(item);
    }

    pub(crate) fn calls(&self) -> Vec<Context> {
        self.contexts.lock().unwrap().clone()
    }

    /// Make the next call signal `entered` and wait for `release`.
    pub(crate) fn hold_next(&self) -> (Arc<Notify>, Arc<Notify>) {
        let pair = (Arc::new(Notify::new()), Arc::new(Notify::new()));
        *self.hold.lock().unwrap() = Some(pair.clone());
        pair
    }
}

#[async_trait]
impl Responder for FakeResponder {
    fn name(&self) -> &str {
        "fake"
    }

    async fn generate_reply(&self, context: &Context) -> Result<Reply, OutreachError> {
        self.contexts.lock().unwrap().push(context.clone());
        let hold = self.hold.lock().unwrap().take();
        if let Some((entered, release)) = hold {
            entered.notify_one();
            release.notified().await;
        }
        match self.script.lock().unwrap().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(e)) => Err(OutreachError::Responder(e)),
            None => Ok(Reply {
                text: "Thanks for your message.".to_string(),
                ..Default::default()
            }),
        }
    }

    async fn is_available(&self) -> bool {
        true
    }
}

pub(crate) fn settings() -> GatewaySettings {
    GatewaySettings {
        poll_interval: Duration::from_millis(20),
        gate_recheck: Duration::from_millis(5),
        stop_timeout: Duration::from_secs(2),
        history_cap: 20,
        context_turns: 10,
        ledger_cap: 100,
        daily_limit: 40,
        pacing: Pacing::none(),
        system_prompt: "You sell phone cases.".to_string(),
        fallback_reply: "FALLBACK".to_string(),
    }
}

pub(crate) struct Harness {
    pub(crate) gw: Arc<Gateway>,
    pub(crate) transport: Arc<FakeTransport>,
    pub(crate) responder: Arc<FakeResponder>,
}

pub(crate) async fn harness_with(
    settings: GatewaySettings,
    directory: Option<Arc<dyn ContactDirectory>>,
) -> Harness {
    let transport = Arc::new(FakeTransport::default());
    let responder = Arc::new(FakeResponder::default());
    let store = Store::in_memory().await.unwrap();
    let gw = Arc::new(Gateway::new(
        transport.clone(),
        responder.clone(),
        store,
        directory,
        settings,
    ));
    Harness {
        gw,
        transport,
        responder,
    }
}

pub(crate) async fn harness() -> Harness {
    harness_with(settings(), None).await
}

pub(crate) async fn history(gw: &Gateway, contact: &str) -> Vec<Turn> {
    gw.state
        .lock()
        .await
        .conversations
        .history(&Contact::from_canonical(contact))
}

pub(crate) const CUSTOMER: &str = "+10000000000";
