//! Text utilities for inbound mail: address cleaning, email-shape
//! validation, and body sanitization.

use once_cell::sync::Lazy;
use regex::Regex;

static ANGLE_BRACKETS: Lazy<Regex> = Lazy::new(|| Regex::new(r"<([^>]+)>").unwrap());
static QUOTED: Lazy<Regex> = Lazy::new(|| Regex::new(r#""([^"]+)""#).unwrap());
static EMAIL_SHAPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

static LINE_ENDINGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\r\n?").unwrap());
static EXCESS_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());
static SENTENCE_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"([.!?])\n").unwrap());
static RUNS_OF_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+").unwrap());
static CLOSING_PHRASE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\n(Best regards|Sincerely|Regards|Thank you)").unwrap());

/// Strip a display name from a formatted address.
///
/// `"Desk <desk@x.com>"` and `"desk@x.com" <anything>` variants reduce to
/// the bare address; anything else is returned trimmed.
pub fn extract_email_address(formatted: &str) -> String {
    if let Some(captures) = ANGLE_BRACKETS.captures(formatted) {
        return captures[1].to_string();
    }

    if let Some(captures) = QUOTED.captures(formatted) {
        return captures[1].to_string();
    }

    formatted.trim().to_string()
}

/// Basic email-shape check: `local@domain.tld`, no whitespace
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_SHAPE.is_match(email)
}

/// Normalize an inbound plain-text body for storage.
///
/// Collapses line-ending and whitespace noise while keeping paragraph
/// structure readable; always ends with a single trailing newline.
pub fn sanitize_email_body(body: &str) -> String {
    let normalized = LINE_ENDINGS.replace_all(body, "\n");
    let normalized = SENTENCE_BREAK.replace_all(&normalized, "$1\n\n");
    let normalized = EXCESS_BLANK_LINES.replace_all(&normalized, "\n\n");
    let normalized = RUNS_OF_SPACE.replace_all(&normalized, " ");
    let normalized = normalized.trim();
    let normalized = CLOSING_PHRASE.replace_all(normalized, "\n\n$1");

    let trimmed_lines: Vec<&str> = normalized.lines().map(str::trim_end).collect();
    format!("{}\n", trimmed_lines.join("\n").trim())
}
