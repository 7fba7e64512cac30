//! Heuristics for replies that stop mid-thought.

/// Replies up to this many characters skip the terminal-punctuation check.
pub const PUNCTUATION_CHECK_MIN_CHARS: usize = 200;

/// Share of the reply, counted from the end, searched for terminal punctuation.
const PUNCTUATION_TAIL_FRACTION: f64 = 0.30;

/// Smallest share of the reply a sentence trim may keep.
pub const MIN_TRIM_KEEP: f64 = 0.65;

const TERMINAL_PUNCTUATION: &[char] = &['.', '!', '?', '؟', '…'];

/// Characters after which a trailing number is a complete list value ("Price: 99").
const LIST_SEPARATORS: &[char] = &[':', '-', '=', '→', '•', '*'];

fn is_digit(c: char) -> bool {
    c.is_ascii_digit() || ('\u{0660}'..='\u{0669}').contains(&c) || ('\u{06F0}'..='\u{06F9}').contains(&c)
}

fn ends_with_bare_digit(text: &str) -> bool {
    if !text.chars().next_back().is_some_and(is_digit) {
        return false;
    }
    let before = text.trim_end_matches(is_digit).trim_end();
    match before.chars().next_back() {
        Some(c) => !LIST_SEPARATORS.contains(&c),
        // The whole reply is a number.
        None => false,
    }
}

/// Whether a reply looks cut off.
///
/// True when it ends in a bare number not introduced by a list separator, or
/// when it is longer than [`PUNCTUATION_CHECK_MIN_CHARS`] and its last 30%
/// has no terminal punctuation.
pub fn looks_incomplete(text: &str) -> bool {
    let text = text.trim_end();
    if text.is_empty() {
        return false;
    }
    if ends_with_bare_digit(text) {
        return true;
    }

    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= PUNCTUATION_CHECK_MIN_CHARS {
        return false;
    }
    let tail_len = ((chars.len() as f64) * PUNCTUATION_TAIL_FRACTION).ceil() as usize;
    !chars[chars.len() - tail_len..]
        .iter()
        .any(|c| TERMINAL_PUNCTUATION.contains(c))
}

/// Append a continuation to the partial reply it continues.
///
/// A space is inserted only between two word characters; a number split
/// across the two parts is rejoined without one.
pub fn join_continuation(partial: &str, continuation: &str) -> String {
    let cont = continuation.trim_end();
    let glue = match (partial.chars().next_back(), cont.chars().next()) {
        (None, _) | (_, None) => "",
        (Some(a), Some(b)) if a.is_whitespace() || b.is_whitespace() => "",
        (Some(a), Some(b)) if is_digit(a) && is_digit(b) => "",
        (_, Some(b)) if b.is_ascii_punctuation() || matches!(b, '،' | '؟' | '…') => "",
        _ => " ",
    };
    format!("{partial}{glue}{cont}")
}

/// Byte offset just past the last sentence boundary, if any.
///
/// Boundaries are terminal punctuation and a colon ending a line. A `.` that
/// is part of a decimal ("9.5") or numbers a list item ("2. Blue") is not one.
fn last_sentence_end(text: &str) -> Option<usize> {
    text.char_indices()
        .filter(|&(i, c)| {
            let next = text[i + c.len_utf8()..].chars().next();
            match c {
                ':' => matches!(next, Some('\n')),
                '.' => {
                    let line_start = text[..i].rfind('\n').map(|p| p + 1).unwrap_or(0);
                    let numbering = text[line_start..i].trim();
                    let list_number =
                        !numbering.is_empty() && numbering.chars().all(|ch| ch.is_ascii_digit());
                    !next.is_some_and(is_digit) && !list_number
                }
                _ => TERMINAL_PUNCTUATION.contains(&c),
            }
        })
        .map(|(i, c)| i + c.len_utf8())
        .last()
}

/// Cut a reply back to its last complete sentence.
///
/// The trim only happens when it keeps at least [`MIN_TRIM_KEEP`] of the
/// characters; otherwise the text is returned as-is (trailing whitespace removed).
pub fn trim_to_last_sentence(text: &str) -> String {
    let text = text.trim_end();
    let Some(end) = last_sentence_end(text) else {
        return text.to_string();
    };
    if end >= text.len() {
        return text.to_string();
    }

    let total = text.chars().count() as f64;
    let kept = text[..end].chars().count() as f64;
    if kept >= total * MIN_TRIM_KEEP {
        text[..end].to_string()
    } else {
        text.to_string()
    }
}
