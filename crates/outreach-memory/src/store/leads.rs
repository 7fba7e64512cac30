//! Lead persistence: append, list, status updates, CSV export.

use super::Store;
use chrono::{DateTime, Utc};
use outreach_core::{
    error::OutreachError,
    lead::{Lead, LeadFilter, LeadStatus, NewLead},
    Contact,
};
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

type LeadRow = (i64, String, String, String, String, String, String, String);

const LEAD_COLUMNS: &str = "id, timestamp, contact, display_name, location_hint, \
                            confirmed_product, conversation_summary, status";

fn row_to_lead(row: LeadRow) -> Result<Lead, OutreachError> {
    let (id, ts, contact, display_name, location_hint, confirmed_product, summary, status) = row;
    let timestamp = DateTime::parse_from_rfc3339(&ts)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| OutreachError::Store(format!("lead {id} has bad timestamp {ts:?}: {e}")))?;
    let status = LeadStatus::from_str(&status)
        .map_err(|e| OutreachError::Store(format!("lead {id}: {e}")))?;
    Ok(Lead {
        id,
        timestamp,
        contact: Contact::from_canonical(contact),
        display_name,
        location_hint,
        confirmed_product,
        conversation_summary: summary,
        status,
    })
}

impl Store {
    /// Append a lead with status `pending` and the current time. Never merges.
    pub async fn append_lead(&self, lead: &NewLead) -> Result<Lead, OutreachError> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO leads \
             (timestamp, contact, display_name, location_hint, confirmed_product, \
              conversation_summary, status) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(now.to_rfc3339())
        .bind(lead.contact.as_str())
        .bind(&lead.display_name)
        .bind(&lead.location_hint)
        .bind(&lead.confirmed_product)
        .bind(&lead.conversation_summary)
        .bind(LeadStatus::Pending.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| OutreachError::Store(format!("failed to append lead: {e}")))?;

        let id = result.last_insert_rowid();
        debug!("store: appended lead #{id} for {}", lead.contact);
        self.get_lead(id).await
    }

    /// Fetch one lead by id.
    pub async fn get_lead(&self, id: i64) -> Result<Lead, OutreachError> {
        let row: Option<LeadRow> =
            sqlx::query_as(&format!("SELECT {LEAD_COLUMNS} FROM leads WHERE id = ?"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| OutreachError::Store(format!("failed to get lead: {e}")))?;
        match row {
            Some(row) => row_to_lead(row),
            None => Err(OutreachError::NotFound(format!("lead {id}"))),
        }
    }

    /// All leads matching `filter`, in append order.
    pub async fn list_leads(&self, filter: &LeadFilter) -> Result<Vec<Lead>, OutreachError> {
        let status = filter.status.map(|s| s.as_str());
        let contact = filter.contact.as_ref().map(|c| c.as_str());
        let rows: Vec<LeadRow> = sqlx::query_as(&format!(
            "SELECT {LEAD_COLUMNS} FROM leads \
             WHERE (? IS NULL OR status = ?) AND (? IS NULL OR contact = ?) \
             ORDER BY id ASC"
        ))
        .bind(status)
        .bind(status)
        .bind(contact)
        .bind(contact)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| OutreachError::Store(format!("failed to list leads: {e}")))?;

        rows.into_iter().map(row_to_lead).collect()
    }

    /// Set the status of the contact's most recent lead.
    ///
    /// Returns the updated lead, or `NotFound` if the contact has none.
    pub async fn update_lead_status(
        &self,
        contact: &Contact,
        status: LeadStatus,
    ) -> Result<Lead, OutreachError> {
        let latest: Option<(i64,)> =
            sqlx::query_as("SELECT id FROM leads WHERE contact = ? ORDER BY id DESC LIMIT 1")
                .bind(contact.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| OutreachError::Store(format!("failed to find lead: {e}")))?;

        let Some((id,)) = latest else {
            return Err(OutreachError::NotFound(format!("no lead for {contact}")));
        };

        sqlx::query("UPDATE leads SET status = ?, updated_at = datetime('now') WHERE id = ?")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| OutreachError::Store(format!("failed to update lead status: {e}")))?;

        debug!("store: lead #{id} status -> {status}");
        self.get_lead(id).await
    }

    /// Lead counts per status, every status included.
    pub async fn count_leads_by_status(&self) -> Result<Vec<(LeadStatus, i64)>, OutreachError> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM leads GROUP BY status")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| OutreachError::Store(format!("failed to count leads: {e}")))?;

        Ok(LeadStatus::ALL
            .iter()
            .map(|s| {
                let n = rows
                    .iter()
                    .find(|(name, _)| name == s.as_str())
                    .map(|(_, n)| *n)
                    .unwrap_or(0);
                (*s, n)
            })
            .collect())
    }

    /// Write leads matching `filter` to a CSV file. Returns the row count.
    pub async fn export_leads_csv(
        &self,
        path: &Path,
        filter: &LeadFilter,
    ) -> Result<usize, OutreachError> {
        let leads = self.list_leads(filter).await?;
        let file = std::fs::File::create(path)?;
        write_leads_csv(file, &leads)?;
        debug!("store: wrote {} leads to {}", leads.len(), path.display());
        Ok(leads.len())
    }
}

/// Serialize leads as CSV with a header row.
pub fn write_leads_csv<W: std::io::Write>(out: W, leads: &[Lead]) -> Result<(), OutreachError> {
    let csv_err = |e: csv::Error| OutreachError::Store(format!("csv export failed: {e}"));
    let mut writer = csv::Writer::from_writer(out);
    writer
        .write_record([
            "timestamp",
            "contact",
            "display_name",
            "location_hint",
            "confirmed_product",
            "conversation_summary",
            "status",
        ])
        .map_err(csv_err)?;
    for lead in leads {
        writer
            .write_record([
                lead.timestamp.to_rfc3339().as_str(),
                lead.contact.as_str(),
                lead.display_name.as_str(),
                lead.location_hint.as_str(),
                lead.confirmed_product.as_str(),
                lead.conversation_summary.as_str(),
                lead.status.as_str(),
            ])
            .map_err(csv_err)?;
    }
    writer.flush()?;
    Ok(())
}
