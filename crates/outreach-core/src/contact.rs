//! Canonical contact identifiers.
//!
//! Every piece of per-customer state (ledger, conversation, pause flag, leads)
//! is keyed by a [`Contact`]. Raw phone strings from CSV files, config, or the
//! CLI are canonicalized to `+<countrycode><digits>` so that two spellings of
//! the same number always address the same state.

use crate::error::OutreachError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Shortest accepted canonical number (country code included).
const MIN_DIGITS: usize = 8;
/// E.164 maximum.
const MAX_DIGITS: usize = 15;
/// Shortest local part accepted when the default country code is prefixed.
const MIN_LOCAL_DIGITS: usize = 7;

/// A canonical phone identifier, e.g. `+966501234567`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Contact(String);

impl Contact {
    /// Canonicalize a raw phone string.
    ///
    /// Arabic-Indic digits are converted, separators dropped, a leading `00`
    /// is read as `+`, and numbers without an international prefix get
    /// `default_country_code` (a leading trunk `0` is replaced). Parsing an
    /// already-canonical contact returns it unchanged.
    pub fn parse(raw: &str, default_country_code: &str) -> Result<Self, OutreachError> {
        let cc: String = default_country_code
            .chars()
            .filter(|c| c.is_ascii_digit())
            .collect();

        let mut digits = String::with_capacity(raw.len());
        let mut international = false;
        for ch in raw.trim().chars() {
            if let Some(d) = to_ascii_digit(ch) {
                digits.push(d);
            } else if ch == '+' && digits.is_empty() {
                international = true;
            }
        }

        if !international {
            if let Some(rest) = digits.strip_prefix("00") {
                digits = rest.to_string();
                international = true;
            }
        }

        let canonical = if international || (!cc.is_empty() && digits.starts_with(&cc)) {
            digits
        } else {
            let local = digits.strip_prefix('0').unwrap_or(&digits);
            if local.len() < MIN_LOCAL_DIGITS {
                return Err(OutreachError::InvalidContact(format!(
                    "'{raw}' is too short to be a phone number"
                )));
            }
            format!("{cc}{local}")
        };

        if !(MIN_DIGITS..=MAX_DIGITS).contains(&canonical.len()) {
            return Err(OutreachError::InvalidContact(format!(
                "'{raw}' has {} digits, expected {MIN_DIGITS}-{MAX_DIGITS}",
                canonical.len()
            )));
        }

        Ok(Self(format!("+{canonical}")))
    }

    /// Wrap a value that is already canonical (e.g. read back from the lead store).
    pub fn from_canonical(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Digits only, without the leading `+` (the form web clients put in chat URLs).
    pub fn digits(&self) -> &str {
        self.0.trim_start_matches('+')
    }
}

impl fmt::Display for Contact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Contact {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Map ASCII, Arabic-Indic, and Extended Arabic-Indic digits to ASCII.
fn to_ascii_digit(ch: char) -> Option<char> {
    match ch {
        '0'..='9' => Some(ch),
        '\u{0660}'..='\u{0669}' => char::from_digit(ch as u32 - 0x0660, 10),
        '\u{06F0}'..='\u{06F9}' => char::from_digit(ch as u32 - 0x06F0, 10),
        _ => None,
    }
}
