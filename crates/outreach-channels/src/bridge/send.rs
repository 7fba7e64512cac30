//! Outbound path: formatting cleanup, chunking, and retry.

use super::types::{SendRequest, SendResponse};
use outreach_core::error::OutreachError;
use std::time::Duration;
use tracing::{error, warn};

/// Retry delays for exponential backoff: 500ms, 1s, 2s.
pub(crate) const RETRY_DELAYS_MS: [u64; 3] = [500, 1000, 2000];

/// Longest text the chat client accepts in one message.
pub(crate) const MAX_MESSAGE_LEN: usize = 4096;

enum Outcome {
    Sent,
    /// The bridge answered and refused (chat did not open, number not on the network).
    Rejected(String),
    /// Network error or 5xx; worth retrying.
    Failed(String),
}

async fn post_once(
    client: &reqwest::Client,
    url: &str,
    body: &SendRequest<'_>,
    timeout: Duration,
) -> Outcome {
    let resp = match client.post(url).json(body).timeout(timeout).send().await {
        Ok(r) => r,
        Err(e) => return Outcome::Failed(e.to_string()),
    };

    let status = resp.status();
    if status.is_server_error() {
        return Outcome::Failed(format!("bridge returned {status}"));
    }

    match resp.json::<SendResponse>().await {
        Ok(r) if r.ok => Outcome::Sent,
        Ok(r) => Outcome::Rejected(r.error.unwrap_or_else(|| format!("bridge returned {status}"))),
        Err(e) => Outcome::Rejected(format!("bad bridge response ({status}): {e}")),
    }
}

/// POST one message to the bridge, retrying transient failures.
///
/// Refusals reported by the bridge itself are returned immediately.
pub(crate) async fn retry_send(
    client: &reqwest::Client,
    url: &str,
    body: &SendRequest<'_>,
    timeout: Duration,
) -> Result<(), OutreachError> {
    let mut last_err = String::new();

    for (attempt, delay_ms) in RETRY_DELAYS_MS.iter().enumerate() {
        match post_once(client, url, body, timeout).await {
            Outcome::Sent => return Ok(()),
            Outcome::Rejected(reason) => {
                return Err(OutreachError::Transport(format!(
                    "send to {} rejected: {reason}",
                    body.contact
                )));
            }
            Outcome::Failed(e) => {
                let attempt_num = attempt + 1;
                if attempt_num < RETRY_DELAYS_MS.len() {
                    warn!(
                        "bridge send attempt {attempt_num}/{} failed: {e}, retrying in {delay_ms}ms",
                        RETRY_DELAYS_MS.len()
                    );
                    tokio::time::sleep(Duration::from_millis(*delay_ms)).await;
                } else {
                    error!(
                        "bridge send attempt {attempt_num}/{} failed: {e}, giving up",
                        RETRY_DELAYS_MS.len()
                    );
                }
                last_err = e;
            }
        }
    }

    Err(OutreachError::Transport(format!(
        "send to {} failed after {} attempts: {last_err}",
        body.contact,
        RETRY_DELAYS_MS.len()
    )))
}

/// Rewrite Markdown the responder may emit into the chat client's own markup.
///
/// - `# Header` (any level) -> `*HEADER*`
/// - `**bold**` -> `*bold*`
/// - `[text](url)` -> `text (url)`
/// - `---` rules dropped
pub(crate) fn sanitize_for_chat(text: &str) -> String {
    let mut lines = Vec::new();

    for line in text.lines() {
        let trimmed = line.trim();

        if trimmed.matches('-').count() >= 3 && trimmed.chars().all(|c| c == '-' || c == ' ') {
            continue;
        }

        let hashes = trimmed.chars().take_while(|c| *c == '#').count();
        if (1..=3).contains(&hashes) && trimmed[hashes..].starts_with(' ') {
            lines.push(format!("*{}*", trimmed[hashes..].trim().to_uppercase()));
            continue;
        }

        lines.push(convert_bold(&convert_links(line)));
    }

    let mut out = lines.join("\n");
    if text.ends_with('\n') {
        out.push('\n');
    }
    out
}

fn convert_links(line: &str) -> String {
    let mut result = line.to_string();
    let mut from = 0;
    while let Some(open) = result[from..].find('[').map(|i| from + i) {
        let Some(mid) = result[open..].find("](").map(|i| open + i) else {
            break;
        };
        let Some(close) = result[mid + 2..].find(')').map(|i| mid + 2 + i) else {
            break;
        };
        let replacement = format!("{} ({})", &result[open + 1..mid], &result[mid + 2..close]);
        result.replace_range(open..=close, &replacement);
        from = open + replacement.len();
    }
    result
}

fn convert_bold(line: &str) -> String {
    let mut result = line.to_string();
    while let Some(start) = result.find("**") {
        let Some(end) = result[start + 2..].find("**").map(|i| start + 2 + i) else {
            break;
        };
        let inner = result[start + 2..end].to_string();
        result.replace_range(start..end + 2, &format!("*{inner}*"));
    }
    result
}

/// Split text into chunks of at most `max_len` bytes.
///
/// Prefers breaking after a newline, then after a space; never splits a
/// multi-byte character.
pub(crate) fn split_message(text: &str, max_len: usize) -> Vec<&str> {
    if text.len() <= max_len {
        return vec![text];
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < text.len() {
        let mut end = (start + max_len).min(text.len());
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        let break_at = if end < text.len() {
            let window = &text[start..end];
            window
                .rfind('\n')
                .or_else(|| window.rfind(' '))
                .map(|i| start + i + 1)
                .unwrap_or(end)
        } else {
            end
        };
        chunks.push(&text[start..break_at]);
        start = break_at;
    }

    chunks
}
