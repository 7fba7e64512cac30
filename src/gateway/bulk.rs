//! Bulk offers: personalized, paced, quota-limited sends that hold the transport.

use super::Gateway;
use chrono::{Local, NaiveDate, TimeZone, Utc};
use outreach_core::{
    config::BulkConfig, context::Role, error::OutreachError, message::OutgoingMessage, Contact,
};
use outreach_memory::DeliveryKind;
use rand::Rng;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::PoisonError;
use std::time::Duration;
use tracing::{info, warn};

/// One row of a bulk send.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BulkRecipient {
    /// Raw phone string as given (CSV, CLI, API).
    pub phone: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Fills `{custom_message}` in the template.
    #[serde(default)]
    pub custom_message: Option<String>,
}

impl BulkRecipient {
    pub fn new(phone: impl Into<String>) -> Self {
        Self {
            phone: phone.into(),
            name: None,
            custom_message: None,
        }
    }
}

/// Per-recipient result of a bulk send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BulkOutcome {
    Sent,
    Failed(String),
    Skipped(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkReport {
    pub sent: usize,
    pub failed: usize,
    pub skipped: usize,
    /// `(raw phone, outcome)` in input order.
    pub results: Vec<(String, BulkOutcome)>,
}

impl BulkReport {
    fn record(&mut self, phone: &str, outcome: BulkOutcome) {
        match outcome {
            BulkOutcome::Sent => self.sent += 1,
            BulkOutcome::Failed(_) => self.failed += 1,
            BulkOutcome::Skipped(_) => self.skipped += 1,
        }
        self.results.push((phone.to_string(), outcome));
    }
}

/// Successful sends allowed per local calendar day.
#[derive(Debug)]
pub(crate) struct DailyQuota {
    day: NaiveDate,
    sent: u32,
    limit: u32,
}

impl DailyQuota {
    pub fn new(limit: u32, today: NaiveDate) -> Self {
        Self {
            day: today,
            sent: 0,
            limit,
        }
    }

    fn roll(&mut self, today: NaiveDate) {
        if today != self.day {
            self.day = today;
            self.sent = 0;
        }
    }

    pub fn remaining(&mut self, today: NaiveDate) -> u32 {
        self.roll(today);
        self.limit.saturating_sub(self.sent)
    }

    pub fn record(&mut self, today: NaiveDate) {
        self.roll(today);
        self.sent += 1;
    }

    /// Seed today's count, e.g. from the delivery log after a restart.
    pub fn restore(&mut self, today: NaiveDate, sent: u32) {
        self.day = today;
        self.sent = sent;
    }
}

/// Waits between bulk sends.
///
/// Each range is inclusive. After every `long_break_every` sends the wait is a
/// long break, else after every `short_break_every` sends a short one, else
/// the base delay. A random extra pause may follow any of them. An `*_every`
/// of 0 never triggers.
#[derive(Debug, Clone, PartialEq)]
pub struct Pacing {
    pub delay: (Duration, Duration),
    pub short_break_every: usize,
    pub short_break: (Duration, Duration),
    pub long_break_every: usize,
    pub long_break: (Duration, Duration),
    pub random_pause_chance: f64,
    pub random_pause: (Duration, Duration),
}

fn secs(lo: u64, hi: u64) -> (Duration, Duration) {
    (Duration::from_secs(lo), Duration::from_secs(hi))
}

impl Pacing {
    pub fn from_config(bulk: &BulkConfig) -> Self {
        Self {
            delay: secs(bulk.min_delay_secs, bulk.max_delay_secs),
            short_break_every: bulk.short_break_every,
            short_break: secs(bulk.short_break_min_secs, bulk.short_break_max_secs),
            long_break_every: bulk.long_break_every,
            long_break: secs(bulk.long_break_min_secs, bulk.long_break_max_secs),
            random_pause_chance: bulk.random_pause_chance,
            random_pause: secs(bulk.random_pause_min_secs, bulk.random_pause_max_secs),
        }
    }

    /// No waiting at all.
    pub fn none() -> Self {
        Self {
            delay: secs(0, 0),
            short_break_every: 0,
            short_break: secs(0, 0),
            long_break_every: 0,
            long_break: secs(0, 0),
            random_pause_chance: 0.0,
            random_pause: secs(0, 0),
        }
    }

    /// The wait before the next send, after `attempted` sends so far.
    pub fn pause_before<R: Rng>(&self, attempted: usize, rng: &mut R) -> Duration {
        let every = |n: usize| n > 0 && attempted > 0 && attempted % n == 0;
        let range = if every(self.long_break_every) {
            self.long_break
        } else if every(self.short_break_every) {
            self.short_break
        } else {
            self.delay
        };
        let mut wait = pick(range, rng);
        if self.random_pause_chance > 0.0 && rng.gen::<f64>() < self.random_pause_chance {
            wait += pick(self.random_pause, rng);
        }
        wait
    }
}

fn pick<R: Rng>((lo, hi): (Duration, Duration), rng: &mut R) -> Duration {
    let lo = lo.as_millis() as u64;
    let hi = (hi.as_millis() as u64).max(lo);
    Duration::from_millis(rng.gen_range(lo..=hi))
}

/// Holds the bulk gate open until dropped.
struct GateGuard<'a>(&'a AtomicUsize);

impl<'a> GateGuard<'a> {
    fn acquire(gate: &'a AtomicUsize) -> Self {
        gate.fetch_add(1, Ordering::SeqCst);
        Self(gate)
    }
}

impl Drop for GateGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

const NAME_PLACEHOLDER: &str = "{name}";
const CUSTOM_PLACEHOLDER: &str = "{custom_message}";

/// Fill a message template for one recipient.
///
/// `{phone}` becomes the canonical number. `{name}` becomes the name; with no
/// name the placeholder is removed and the spaces around it collapse
/// ("Hi {name}, welcome" → "Hi, welcome"). `{custom_message}` is filled
/// last; without one, the blank lines it leaves behind are squeezed.
pub fn personalize(
    template: &str,
    name: Option<&str>,
    phone: &str,
    custom_message: Option<&str>,
) -> String {
    let text = fill_name(&template.replace("{phone}", phone), name);
    match custom_message.map(str::trim).filter(|c| !c.is_empty()) {
        Some(custom) => text.replace(CUSTOM_PLACEHOLDER, custom),
        None if text.contains(CUSTOM_PLACEHOLDER) => {
            squeeze_blank_lines(&text.replace(CUSTOM_PLACEHOLDER, ""))
        }
        None => text,
    }
}

/// At most one empty line in a row, none at the end.
fn squeeze_blank_lines(text: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    for line in text.lines().map(str::trim_end) {
        if line.is_empty() && out.last().is_some_and(|l| l.is_empty()) {
            continue;
        }
        out.push(line);
    }
    out.join("\n").trim_end().to_string()
}

fn fill_name(text: &str, name: Option<&str>) -> String {
    if let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) {
        return text.replace(NAME_PLACEHOLDER, name);
    }

    let mut text = text.to_string();
    while let Some(start) = text.find(NAME_PLACEHOLDER) {
        let end = start + NAME_PLACEHOLDER.len();
        let gap_start = text[..start].trim_end_matches([' ', '\t']).len();
        let gap_end = text.len() - text[end..].trim_start_matches([' ', '\t']).len();
        let next = text[gap_end..].chars().next();
        let prev = text[..gap_start].chars().next_back();
        let joiner = match (prev, next) {
            (None, _) | (_, None) => "",
            (Some('\n'), _) | (_, Some('\n')) => "",
            (_, Some(c)) if c.is_ascii_punctuation() || c == '،' => "",
            _ => " ",
        };
        text.replace_range(gap_start..gap_end, joiner);
    }
    text
}

impl Gateway {
    /// Seed today's quota from the delivery log so a restart does not reset it.
    pub async fn restore_quota(&self) -> Result<u32, OutreachError> {
        let today = Local::now().date_naive();
        let midnight = today
            .and_hms_opt(0, 0, 0)
            .and_then(|t| Local.from_local_datetime(&t).earliest())
            .map(|t| t.with_timezone(&Utc))
            .ok_or_else(|| OutreachError::Config("cannot resolve local midnight".into()))?;

        let sent = self.deliveries.offers_sent_since(midnight).await?;
        self.quota
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .restore(today, sent);
        info!(
            "daily quota: {sent}/{} already sent today",
            self.settings.daily_limit
        );
        Ok(sent)
    }

    fn quota_remaining(&self) -> u32 {
        self.quota
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remaining(Local::now().date_naive())
    }

    fn quota_record(&self) {
        self.quota
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record(Local::now().date_naive());
    }

    /// Pause before the next bulk send.
    async fn pace(&self, attempted: usize) {
        let delay = self
            .settings
            .pacing
            .pause_before(attempted, &mut rand::thread_rng());
        if !delay.is_zero() {
            info!("bulk: waiting {}s after {attempted} sends", delay.as_secs());
            tokio::time::sleep(delay).await;
        }
    }

    /// After a successful offer: start monitoring the contact with the offer as
    /// its first assistant turn, or append the offer if already monitored.
    ///
    /// The caller must hold the transport lock.
    async fn track_offer(&self, contact: &Contact, text: &str) {
        {
            let mut state = self.state.lock().await;
            if state.is_monitored(contact) {
                state.conversations.append(contact, Role::Assistant, text);
                return;
            }
        }
        self.enroll(contact, Some(text)).await;
    }

    /// Send one offer, pacing first when `attempted` sends came before it.
    /// Caller holds the gate and the transport lock.
    async fn send_offer(
        &self,
        recipient: &BulkRecipient,
        template: &str,
        attachments: &[PathBuf],
        attempted: usize,
    ) -> (BulkOutcome, bool) {
        let contact = match self.normalize(&recipient.phone) {
            Ok(contact) => contact,
            Err(e) => return (BulkOutcome::Failed(e.to_string()), false),
        };
        if self.quota_remaining() == 0 {
            return (
                BulkOutcome::Skipped(format!(
                    "daily limit of {} reached",
                    self.settings.daily_limit
                )),
                false,
            );
        }

        if attempted > 0 {
            self.pace(attempted).await;
        }
        let message = OutgoingMessage {
            text: personalize(
                template,
                recipient.name.as_deref(),
                contact.as_str(),
                recipient.custom_message.as_deref(),
            ),
            attachments: attachments.to_vec(),
        };
        match self.deliver(&contact, &message, DeliveryKind::Offer).await {
            Ok(()) => {
                self.quota_record();
                self.track_offer(&contact, &message.text).await;
                (BulkOutcome::Sent, true)
            }
            Err(e) => (BulkOutcome::Failed(e.to_string()), true),
        }
    }

    /// Send a personalized offer to every recipient.
    ///
    /// Holds the bulk gate and the transport for the whole run, so the
    /// monitoring loop does not poll meanwhile. Failures never stop the run.
    pub async fn send_bulk(
        &self,
        recipients: &[BulkRecipient],
        template: &str,
        attachments: &[PathBuf],
    ) -> BulkReport {
        let _gate = GateGuard::acquire(&self.bulk_gate);
        let _transport = self.transport_lock.lock().await;
        info!(
            "bulk: sending to {} recipients ({} attachments)",
            recipients.len(),
            attachments.len()
        );

        let mut report = BulkReport::default();
        let mut attempted = 0;
        for recipient in recipients {
            let (outcome, tried) = self
                .send_offer(recipient, template, attachments, attempted)
                .await;
            attempted += usize::from(tried);
            if let BulkOutcome::Failed(reason) | BulkOutcome::Skipped(reason) = &outcome {
                warn!("bulk: {} not sent: {reason}", recipient.phone);
            }
            report.record(&recipient.phone, outcome);
        }

        info!(
            "bulk: done | sent: {} | failed: {} | skipped: {}",
            report.sent, report.failed, report.skipped
        );
        report
    }

    /// Send a single message. Gated and quota-checked like a bulk send.
    pub async fn send_message(&self, raw: &str, text: &str, attachments: &[PathBuf]) -> bool {
        let _gate = GateGuard::acquire(&self.bulk_gate);
        let _transport = self.transport_lock.lock().await;
        let (outcome, _) = self
            .send_offer(&BulkRecipient::new(raw), text, attachments, 0)
            .await;
        match outcome {
            BulkOutcome::Sent => true,
            BulkOutcome::Failed(reason) | BulkOutcome::Skipped(reason) => {
                warn!("send to {raw} not completed: {reason}");
                false
            }
        }
    }
}
