//! Contacts directory read from a CSV export.
//!
//! Headers are matched case-insensitively: `phone` (or `phone_formatted`,
//! `mobile`, `number`), `name`, `city` (or `address`, `location`), and
//! `custom_message`. A UTF-8 BOM on the first header is ignored.

use async_trait::async_trait;
use outreach_core::{
    error::OutreachError, lead::ContactInfo, traits::ContactDirectory, Contact,
};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

const PHONE_HEADERS: &[&str] = &["phone", "phone_formatted", "mobile", "number"];
const NAME_HEADERS: &[&str] = &["name", "full_name", "customer"];
const CITY_HEADERS: &[&str] = &["city", "address", "location"];
const CUSTOM_MESSAGE_HEADERS: &[&str] = &["custom_message", "custom message"];

/// One raw row of a contacts CSV. The phone is not yet canonicalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactRow {
    pub phone: String,
    pub name: String,
    pub city: String,
    /// Per-contact text for a bulk template's `{custom_message}`.
    pub custom_message: String,
}

fn find_column(headers: &[String], candidates: &[&str]) -> Option<usize> {
    candidates
        .iter()
        .find_map(|c| headers.iter().position(|h| h == c))
}

/// Parse contact rows from CSV. Rows with an empty phone cell are skipped.
pub fn read_contact_rows<R: Read>(reader: R) -> Result<Vec<ContactRow>, OutreachError> {
    let csv_err = |e: csv::Error| OutreachError::Config(format!("contacts csv: {e}"));
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_lowercase())
        .collect();

    let phone_col = find_column(&headers, PHONE_HEADERS).ok_or_else(|| {
        OutreachError::Config(format!(
            "contacts csv has no phone column (expected one of {})",
            PHONE_HEADERS.join(", ")
        ))
    })?;
    let name_col = find_column(&headers, NAME_HEADERS);
    let city_col = find_column(&headers, CITY_HEADERS);
    let custom_col = find_column(&headers, CUSTOM_MESSAGE_HEADERS);

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record.map_err(csv_err)?;
        let cell = |col: Option<usize>| {
            col.and_then(|i| record.get(i))
                .unwrap_or_default()
                .to_string()
        };
        let phone = cell(Some(phone_col));
        if phone.is_empty() {
            continue;
        }
        rows.push(ContactRow {
            phone,
            name: cell(name_col),
            city: cell(city_col),
            custom_message: cell(custom_col),
        });
    }
    Ok(rows)
}

/// In-memory contacts directory keyed by canonical contact.
#[derive(Debug, Default)]
pub struct CsvDirectory {
    entries: HashMap<Contact, ContactInfo>,
}

impl CsvDirectory {
    /// Load a directory from a CSV file. Rows whose phone cannot be parsed are skipped.
    pub fn load(path: &Path, default_country_code: &str) -> Result<Self, OutreachError> {
        let file = std::fs::File::open(path).map_err(|e| {
            OutreachError::Config(format!("failed to open {}: {e}", path.display()))
        })?;
        let directory = Self::from_reader(file, default_country_code)?;
        info!(
            "contacts directory loaded: {} entries from {}",
            directory.len(),
            path.display()
        );
        Ok(directory)
    }

    pub fn from_reader<R: Read>(reader: R, default_country_code: &str) -> Result<Self, OutreachError> {
        let mut entries = HashMap::new();
        for row in read_contact_rows(reader)? {
            match Contact::parse(&row.phone, default_country_code) {
                Ok(contact) => {
                    entries.insert(
                        contact,
                        ContactInfo {
                            display_name: row.name,
                            location_hint: row.city,
                        },
                    );
                }
                Err(e) => debug!("directory: skipping row: {e}"),
            }
        }
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl ContactDirectory for CsvDirectory {
    async fn lookup(&self, contact: &Contact) -> Result<Option<ContactInfo>, OutreachError> {
        Ok(self.entries.get(contact).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\u{feff}Name,Phone,Address,Product\n\
                          أحمد,0501234567,الرياض,Blue 3-pack\n\
                          Sara,+33 6 31 05 58 10,Paris,\n\
                          Nobody,,Jeddah,\n\
                          Broken,12,Dammam,\n";

    #[test]
    fn test_read_rows_matches_headers() {
        let rows = read_contact_rows(SAMPLE.as_bytes()).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].name, "أحمد");
        assert_eq!(rows[0].phone, "0501234567");
        assert_eq!(rows[0].city, "الرياض");
    }

    #[test]
    fn test_missing_phone_column_is_error() {
        let err = read_contact_rows("name,city\nA,B\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("phone"));
    }

    #[test]
    fn test_rows_without_optional_columns() {
        let rows = read_contact_rows("phone\n0501234567\n".as_bytes()).unwrap();
        assert_eq!(rows[0].name, "");
        assert_eq!(rows[0].city, "");
        assert_eq!(rows[0].custom_message, "");
    }

    #[test]
    fn test_custom_message_column() {
        let csv = "phone,name,custom_message\n\
                   0501234567,Sara,Special offer for you!\n\
                   0509876543,Omar,\n";
        let rows = read_contact_rows(csv.as_bytes()).unwrap();
        assert_eq!(rows[0].custom_message, "Special offer for you!");
        assert_eq!(rows[1].custom_message, "");
    }

    #[tokio::test]
    async fn test_directory_lookup_by_canonical_contact() {
        let dir = CsvDirectory::from_reader(SAMPLE.as_bytes(), "966").unwrap();
        assert_eq!(dir.len(), 2);

        let info = dir
            .lookup(&Contact::from_canonical("+966501234567"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(info.display_name, "أحمد");
        assert_eq!(info.location_hint, "الرياض");

        let sara = dir
            .lookup(&Contact::from_canonical("+33631055810"))
            .await
            .unwrap();
        assert!(sara.is_some());

        let none = dir
            .lookup(&Contact::from_canonical("+10000000000"))
            .await
            .unwrap();
        assert!(none.is_none());
    }
}
