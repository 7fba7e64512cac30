//! Lead marker extraction and reply completeness checks.
//!
//! Pure text functions, no I/O:
//! - this module: `[LEAD_CONFIRMED: <product>]` extraction and stripping
//! - `completeness`: cut-off reply detection, continuation joining, sentence trimming

mod completeness;

pub use completeness::*;

/// Opening of the lead marker. Case-sensitive.
pub const LEAD_MARKER_TAG: &str = "[LEAD_CONFIRMED";

/// Structured lead signal found in a responder reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadMarker {
    /// Trimmed marker payload. May be empty for a bare `[LEAD_CONFIRMED]`.
    pub confirmed_product: String,
}

/// Locate the first well-formed marker at or after `from`.
///
/// Returns `(start, end, payload)`, where `end` is exclusive. The tag must be
/// followed by `:` or `]`. The payload runs to the next `]`; an unclosed
/// marker runs to end of line.
fn find_marker(text: &str, from: usize) -> Option<(usize, usize, &str)> {
    let mut search = from;
    while let Some(i) = text[search..].find(LEAD_MARKER_TAG) {
        let start = search + i;
        let after = start + LEAD_MARKER_TAG.len();
        match text[after..].chars().next() {
            Some(']') => return Some((start, after + 1, "")),
            Some(':') => {
                let body = after + 1;
                let rest = &text[body..];
                let line_end = rest.find('\n').unwrap_or(rest.len());
                return Some(match rest[..line_end].find(']') {
                    Some(close) => (start, body + close + 1, &rest[..close]),
                    None => (start, body + line_end, &rest[..line_end]),
                });
            }
            _ => search = after,
        }
    }
    None
}

/// Split a raw reply into the text the customer sees and the lead signal.
///
/// Only the first marker is honored; every marker is removed. The whitespace
/// around a removed marker collapses to one space, or to one newline when it
/// spanned a line break. Without a marker the input is returned unchanged.
pub fn extract_lead(raw: &str) -> (String, Option<LeadMarker>) {
    let Some((_, _, payload)) = find_marker(raw, 0) else {
        return (raw.to_string(), None);
    };
    let lead = LeadMarker {
        confirmed_product: payload.trim().to_string(),
    };

    let mut visible = raw.to_string();
    while let Some((start, end)) = find_marker(&visible, 0).map(|(s, e, _)| (s, e)) {
        let gap_start = visible[..start].trim_end().len();
        let gap_end = end + (visible[end..].len() - visible[end..].trim_start().len());
        let joiner = if gap_start == 0 || gap_end == visible.len() {
            ""
        } else if visible[gap_start..gap_end].contains('\n') {
            "\n"
        } else {
            " "
        };
        visible.replace_range(gap_start..gap_end, joiner);
    }

    (visible.trim().to_string(), Some(lead))
}

/// The customer-visible part of a reply (all lead markers removed).
pub fn strip_lead_markers(raw: &str) -> String {
    extract_lead(raw).0
}

#[cfg(test)]
mod tests;
