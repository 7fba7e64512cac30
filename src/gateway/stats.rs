//! Gateway counters.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic counters updated from the loop and foreground operations.
#[derive(Default)]
pub(crate) struct Stats {
    pub(crate) messages_sent: AtomicU64,
    pub(crate) messages_failed: AtomicU64,
    pub(crate) replies_sent: AtomicU64,
    pub(crate) responder_failures: AtomicU64,
    pub(crate) poll_failures: AtomicU64,
    pub(crate) leads_captured: AtomicU64,
    pub(crate) cycles: AtomicU64,
}

/// Check marks on our messages as last seen in the chats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ReceiptCounts {
    /// Delivered but not yet read.
    pub(crate) delivered: usize,
    pub(crate) read: usize,
}

/// Point-in-time view of the gateway, suitable for logging or JSON output.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StatsSnapshot {
    pub messages_sent: u64,
    pub messages_failed: u64,
    pub replies_sent: u64,
    pub responder_failures: u64,
    pub poll_failures: u64,
    pub leads_captured: u64,
    pub cycles: u64,
    pub conversations: usize,
    pub monitored_contacts: usize,
    pub active_contacts: usize,
    /// Percentage of sends that went through; 0 before the first send.
    pub success_rate: f64,
    /// Our messages showing delivered (not read) in the latest polls.
    pub messages_delivered: usize,
    pub messages_read: usize,
}

impl Stats {
    pub fn snapshot(
        &self,
        conversations: usize,
        monitored_contacts: usize,
        active_contacts: usize,
        receipts: ReceiptCounts,
    ) -> StatsSnapshot {
        let sent = self.messages_sent.load(Ordering::Relaxed);
        let failed = self.messages_failed.load(Ordering::Relaxed);
        let attempts = sent + failed;
        let success_rate = if attempts == 0 {
            0.0
        } else {
            (sent as f64 / attempts as f64 * 1000.0).round() / 10.0
        };

        StatsSnapshot {
            messages_sent: sent,
            messages_failed: failed,
            replies_sent: self.replies_sent.load(Ordering::Relaxed),
            responder_failures: self.responder_failures.load(Ordering::Relaxed),
            poll_failures: self.poll_failures.load(Ordering::Relaxed),
            leads_captured: self.leads_captured.load(Ordering::Relaxed),
            cycles: self.cycles.load(Ordering::Relaxed),
            conversations,
            monitored_contacts,
            active_contacts,
            success_rate,
            messages_delivered: receipts.delivered,
            messages_read: receipts.read,
        }
    }
}
