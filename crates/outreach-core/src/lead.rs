//! Lead records: confirmed purchase intent extracted from conversations.

use crate::{contact::Contact, error::OutreachError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Follow-up status of a lead. Mutable after creation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    #[default]
    Pending,
    Contacted,
    Converted,
    Rejected,
}

impl LeadStatus {
    pub const ALL: [LeadStatus; 4] = [
        Self::Pending,
        Self::Contacted,
        Self::Converted,
        Self::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Contacted => "contacted",
            Self::Converted => "converted",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeadStatus {
    type Err = OutreachError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "contacted" => Ok(Self::Contacted),
            "converted" => Ok(Self::Converted),
            "rejected" => Ok(Self::Rejected),
            other => Err(OutreachError::Config(format!(
                "unknown lead status '{other}' (expected pending, contacted, converted, rejected)"
            ))),
        }
    }
}

/// A lead ready to be appended. Status and timestamp are assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLead {
    pub contact: Contact,
    pub display_name: String,
    pub location_hint: String,
    pub confirmed_product: String,
    pub conversation_summary: String,
}

/// A persisted lead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lead {
    /// Append order; later leads have larger ids.
    pub id: i64,
    /// Processing time of the reply that carried the marker.
    pub timestamp: DateTime<Utc>,
    pub contact: Contact,
    pub display_name: String,
    pub location_hint: String,
    pub confirmed_product: String,
    pub conversation_summary: String,
    pub status: LeadStatus,
}

/// Optional constraints for listing leads.
#[derive(Debug, Clone, Default)]
pub struct LeadFilter {
    pub status: Option<LeadStatus>,
    pub contact: Option<Contact>,
}

impl LeadFilter {
    pub fn matches(&self, lead: &Lead) -> bool {
        self.status.map_or(true, |s| s == lead.status)
            && self.contact.as_ref().map_or(true, |c| *c == lead.contact)
    }
}

/// Enrichment data from an external contacts directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub display_name: String,
    pub location_hint: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip_through_str() {
        for status in LeadStatus::ALL {
            assert_eq!(status.as_str().parse::<LeadStatus>().unwrap(), status);
        }
        assert_eq!(
            " Converted ".parse::<LeadStatus>().unwrap(),
            LeadStatus::Converted
        );
        assert!("done".parse::<LeadStatus>().is_err());
    }

    #[test]
    fn test_filter_matches() {
        let lead = Lead {
            id: 1,
            timestamp: Utc::now(),
            contact: Contact::from_canonical("+10000000000"),
            display_name: String::new(),
            location_hint: String::new(),
            confirmed_product: "3-pack".into(),
            conversation_summary: String::new(),
            status: LeadStatus::Pending,
        };
        assert!(LeadFilter::default().matches(&lead));
        assert!(LeadFilter {
            status: Some(LeadStatus::Pending),
            contact: Some(Contact::from_canonical("+10000000000")),
        }
        .matches(&lead));
        assert!(!LeadFilter {
            status: Some(LeadStatus::Converted),
            contact: None,
        }
        .matches(&lead));
    }
}
