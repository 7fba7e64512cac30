//! Lead capture and lead-store operations exposed to the CLI.

use super::Gateway;
use crate::markers::LeadMarker;
use outreach_core::{
    context::Turn,
    error::OutreachError,
    lead::{ContactInfo, Lead, LeadFilter, LeadStatus, NewLead},
    Contact,
};
use std::path::Path;
use std::sync::atomic::Ordering;
use tracing::{error, info, warn};

/// Turns included in a lead's conversation summary.
const SUMMARY_TURNS: usize = 6;
/// Characters kept per summarized turn.
const SUMMARY_TURN_CHARS: usize = 80;

/// Render the tail of a conversation as `Customer: …` / `Assistant: …` lines.
pub fn summarize_conversation(turns: &[Turn]) -> String {
    let start = turns.len().saturating_sub(SUMMARY_TURNS);
    turns[start..]
        .iter()
        .map(|turn| {
            let text: String = turn
                .text
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
                .chars()
                .take(SUMMARY_TURN_CHARS)
                .collect();
            format!("{}: {text}", turn.role.label())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

impl Gateway {
    /// Persist a lead for `contact` from a marker found in a reply.
    ///
    /// Enrichment and persistence failures are logged, never propagated.
    pub(super) async fn capture_lead(&self, contact: &Contact, marker: &LeadMarker) {
        let summary = {
            let state = self.state.lock().await;
            summarize_conversation(&state.conversations.history(contact))
        };
        let info = self.enrich(contact).await;

        let lead = NewLead {
            contact: contact.clone(),
            display_name: info.display_name,
            location_hint: info.location_hint,
            confirmed_product: marker.confirmed_product.clone(),
            conversation_summary: summary,
        };
        match self.store.append_lead(&lead).await {
            Ok(saved) => {
                self.stats.leads_captured.fetch_add(1, Ordering::Relaxed);
                info!(
                    "lead #{} captured for {contact}: {}",
                    saved.id, saved.confirmed_product
                );
            }
            Err(e) => error!("failed to persist lead for {contact}: {e}"),
        }
    }

    /// Look the contact up in the directory; empty fields when absent or failing.
    async fn enrich(&self, contact: &Contact) -> ContactInfo {
        let Some(directory) = &self.directory else {
            return ContactInfo::default();
        };
        match directory.lookup(contact).await {
            Ok(info) => info.unwrap_or_default(),
            Err(e) => {
                warn!("contact lookup failed for {contact}: {e}");
                ContactInfo::default()
            }
        }
    }

    pub async fn list_leads(&self, filter: &LeadFilter) -> Result<Vec<Lead>, OutreachError> {
        self.store.list_leads(filter).await
    }

    /// Set the status of the contact's most recent lead.
    pub async fn update_lead_status(
        &self,
        contact: &Contact,
        status: LeadStatus,
    ) -> Result<Lead, OutreachError> {
        let lead = self.store.update_lead_status(contact, status).await?;
        info!("lead #{} for {contact} is now {status}", lead.id);
        Ok(lead)
    }

    /// Write matching leads to a CSV file. Returns the number of rows written.
    pub async fn export_leads(&self, path: &Path, filter: &LeadFilter) -> Result<usize, OutreachError> {
        let n = self.store.export_leads_csv(path, filter).await?;
        info!("exported {n} leads to {}", path.display());
        Ok(n)
    }
}
