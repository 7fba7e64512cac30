//! Delivery log: records every outbound send and whether it went through.

use chrono::{DateTime, SecondsFormat, Utc};
use outreach_core::{error::OutreachError, Contact};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

/// What kind of message was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryKind {
    /// Bulk offer (or single ad-hoc send).
    Offer,
    /// Automated reply to an inbound message.
    Reply,
}

impl DeliveryKind {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Offer => "offer",
            Self::Reply => "reply",
        }
    }
}

/// Outcome of a send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStatus {
    Ok,
    Error,
}

impl DeliveryStatus {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Error => "error",
        }
    }
}

/// An entry to write to the delivery log.
pub struct DeliveryEntry {
    pub contact: Contact,
    pub kind: DeliveryKind,
    pub text: String,
    pub status: DeliveryStatus,
    pub error: Option<String>,
}

/// Delivery logger sharing the lead store's pool.
#[derive(Clone)]
pub struct DeliveryLog {
    pool: SqlitePool,
}

impl DeliveryLog {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Write an entry to the delivery log.
    pub async fn log(&self, entry: &DeliveryEntry) -> Result<(), OutreachError> {
        let id = Uuid::new_v4().to_string();

        sqlx::query(
            "INSERT INTO deliveries (id, contact, kind, text, status, error, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(entry.contact.as_str())
        .bind(entry.kind.as_str())
        .bind(&entry.text)
        .bind(entry.status.as_str())
        .bind(&entry.error)
        .bind(timestamp(Utc::now()))
        .execute(&self.pool)
        .await
        .map_err(|e| OutreachError::Store(format!("delivery log write failed: {e}")))?;

        debug!(
            "delivery: {} {} [{}] {}",
            entry.kind.as_str(),
            entry.contact,
            entry.status.as_str(),
            truncate(&entry.text, 80)
        );

        Ok(())
    }

    /// Successful offers sent since `since`. Used to restore the daily quota on restart.
    pub async fn offers_sent_since(&self, since: DateTime<Utc>) -> Result<u32, OutreachError> {
        let (n,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM deliveries \
             WHERE kind = 'offer' AND status = 'ok' AND created_at >= ?",
        )
        .bind(timestamp(since))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| OutreachError::Store(format!("delivery count failed: {e}")))?;
        Ok(n.max(0) as u32)
    }

    /// Totals as (ok, error) per kind: `[(offer_ok, offer_err), (reply_ok, reply_err)]`.
    pub async fn totals(&self) -> Result<[(i64, i64); 2], OutreachError> {
        let rows: Vec<(String, String, i64)> = sqlx::query_as(
            "SELECT kind, status, COUNT(*) FROM deliveries GROUP BY kind, status",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| OutreachError::Store(format!("delivery totals failed: {e}")))?;

        let mut totals = [(0i64, 0i64); 2];
        for (kind, status, n) in rows {
            let slot = match kind.as_str() {
                "offer" => &mut totals[0],
                _ => &mut totals[1],
            };
            if status == "ok" {
                slot.0 += n;
            } else {
                slot.1 += n;
            }
        }
        Ok(totals)
    }
}

/// Fixed-width UTC timestamp so `created_at` compares lexicographically.
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Truncate to at most `max` bytes on a char boundary.
fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
