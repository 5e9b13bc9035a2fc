//! Heuristic lead extraction from inbound message bodies
//!
//! Each field has an ordered list of labeled rules; the first rule whose
//! capture passes its validator wins. The ordering is a contract, not an
//! accident: labeled patterns outrank bare-token fallbacks, so a portal
//! contact form's `Email:` line beats any address mentioned in prose.
//!
//! Pure and deterministic; no I/O.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::text::is_valid_email;

/// Best-effort lead details recovered from a message body.
/// Every field is optional; callers must not assume any of them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadInfo {
    pub email: Option<String>,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub message: Option<String>,
}

/// One labeled rule in a field's cascade
struct ExtractionRule {
    label: &'static str,
    pattern: Regex,
    validator: Option<fn(&str) -> bool>,
}

impl ExtractionRule {
    fn new(label: &'static str, pattern: &str, validator: Option<fn(&str) -> bool>) -> Self {
        Self {
            label,
            pattern: Regex::new(pattern).expect("invalid extraction pattern"),
            validator,
        }
    }
}

/// Email rules, ordered by specificity; all captures must be email-shaped
static EMAIL_RULES: Lazy<Vec<ExtractionRule>> = Lazy::new(|| {
    vec![
        ExtractionRule::new(
            "email",
            r"(?i)Email:\s*([^\s@<>]+@[^\s@<>]+\.[^\s@<>]+)",
            Some(is_valid_email),
        ),
        ExtractionRule::new(
            "email-address",
            r"(?i)Email Address:\s*([^\s@<>]+@[^\s@<>]+\.[^\s@<>]+)",
            Some(is_valid_email),
        ),
        ExtractionRule::new(
            "from",
            r"(?i)From:\s*([^\s@<>]+@[^\s@<>]+\.[^\s@<>]+)",
            Some(is_valid_email),
        ),
        ExtractionRule::new(
            "contact-email",
            r"(?i)Contact Email:\s*([^\s@<>]+@[^\s@<>]+\.[^\s@<>]+)",
            Some(is_valid_email),
        ),
        ExtractionRule::new(
            "bare-token",
            r"([^\s@<>]+@[^\s@<>]+\.[^\s@<>]+)",
            Some(is_valid_email),
        ),
    ]
});

static NAME_RULES: Lazy<Vec<ExtractionRule>> = Lazy::new(|| {
    vec![
        ExtractionRule::new("name", r"(?i)Name:\s*(.+)", None),
        ExtractionRule::new("full-name", r"(?i)Full Name:\s*(.+)", None),
        ExtractionRule::new("from-display", r"(?i)From:\s*(.+?)\s*<", None),
        ExtractionRule::new("contact-name", r"(?i)Contact Name:\s*(.+)", None),
    ]
});

static PHONE_RULES: Lazy<Vec<ExtractionRule>> = Lazy::new(|| {
    vec![
        ExtractionRule::new("phone", r"(?i)Phone:\s*(.+)", None),
        ExtractionRule::new("phone-number", r"(?i)Phone Number:\s*(.+)", None),
        ExtractionRule::new("telephone", r"(?i)Telephone:\s*(.+)", None),
        ExtractionRule::new("contact-phone", r"(?i)Contact Phone:\s*(.+)", None),
        ExtractionRule::new("bare-number", r"(\+?\d[\d\s\-()]{7,}\d)", None),
    ]
});

static MESSAGE_LABEL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)Message:\s*").unwrap());
static NEXT_LABELED_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\w+:").unwrap());

/// First-match-wins over a rule cascade
fn first_match(body: &str, rules: &[ExtractionRule]) -> Option<String> {
    for rule in rules {
        if let Some(captures) = rule.pattern.captures(body) {
            if let Some(capture) = captures.get(1) {
                let value = capture.as_str().trim();
                if value.is_empty() {
                    continue;
                }
                if rule.validator.map(|v| v(value)).unwrap_or(true) {
                    tracing::trace!("Lead field matched rule '{}'", rule.label);
                    return Some(value.to_string());
                }
            }
        }
    }
    None
}

/// A `Message:` labeled block, up to the next labeled line or end of text
fn labeled_message_block(body: &str) -> Option<String> {
    let label = MESSAGE_LABEL.find(body)?;
    let rest = &body[label.end()..];
    let end = NEXT_LABELED_LINE
        .find(rest)
        .map(|m| m.start())
        .unwrap_or(rest.len());
    let block = rest[..end].trim();
    (!block.is_empty()).then(|| block.to_string())
}

/// Extract lead contact details from a raw message body.
///
/// Returns the all-`None` record for empty input. The free-text message
/// falls back to the entire trimmed body when no `Message:` block exists.
pub fn extract_lead_info(body: &str) -> LeadInfo {
    if body.trim().is_empty() {
        return LeadInfo::default();
    }

    LeadInfo {
        email: first_match(body, &EMAIL_RULES),
        name: first_match(body, &NAME_RULES),
        phone: first_match(body, &PHONE_RULES),
        message: labeled_message_block(body).or_else(|| Some(body.trim().to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_body_returns_all_none() {
        assert_eq!(extract_lead_info(""), LeadInfo::default());
        assert_eq!(extract_lead_info("   \n  "), LeadInfo::default());
    }

    #[test]
    fn test_labeled_email_beats_bare_token() {
        // A bare address appears first in the text; the labeled one wins
        let body = "Please reply to other@elsewhere.net\nEmail: x@y.com";
        let lead = extract_lead_info(body);
        assert_eq!(lead.email.as_deref(), Some("x@y.com"));
    }

    #[test]
    fn test_bare_email_token_as_fallback() {
        let lead = extract_lead_info("you can reach me at jane@x.com any time");
        assert_eq!(lead.email.as_deref(), Some("jane@x.com"));
    }

    #[test]
    fn test_no_email_is_none_never_empty() {
        let lead = extract_lead_info("no contact details in here");
        assert_eq!(lead.email, None);
    }

    #[test]
    fn test_name_cascade_first_match_wins() {
        let body = "Full Name: Jane Doe\nContact Name: Someone Else";
        let lead = extract_lead_info(body);
        // "Name:" matches inside "Full Name:" first, same as the ordered contract
        assert_eq!(lead.name.as_deref(), Some("Jane Doe"));
    }

    #[test]
    fn test_from_display_name() {
        let lead = extract_lead_info("From: Jane Doe <jane@x.com>");
        assert_eq!(lead.name.as_deref(), Some("Jane Doe"));
        assert_eq!(lead.email.as_deref(), Some("jane@x.com"));
    }

    #[test]
    fn test_phone_labeled_and_bare() {
        let lead = extract_lead_info("Phone: 082 555 1234");
        assert_eq!(lead.phone.as_deref(), Some("082 555 1234"));

        let lead = extract_lead_info("call me on +27 82 555 1234 please");
        assert_eq!(lead.phone.as_deref(), Some("+27 82 555 1234"));
    }

    #[test]
    fn test_message_block_stops_at_next_label() {
        let body = "Message: I'd love a viewing\nthis week if possible\nPhone: 0825551234";
        let lead = extract_lead_info(body);
        assert_eq!(
            lead.message.as_deref(),
            Some("I'd love a viewing\nthis week if possible")
        );
    }

    #[test]
    fn test_message_falls_back_to_whole_body() {
        let body = "  Just checking availability.  ";
        let lead = extract_lead_info(body);
        assert_eq!(lead.message.as_deref(), Some("Just checking availability."));
    }

    #[test]
    fn test_contact_form_scenario() {
        let body = "Hi, I'm interested. Email: jane@x.com Phone: 082 555 1234";
        let lead = extract_lead_info(body);
        assert_eq!(lead.email.as_deref(), Some("jane@x.com"));
        assert_eq!(lead.phone.as_deref(), Some("082 555 1234"));
        assert_eq!(lead.name, None);
    }

    #[test]
    fn test_deterministic_over_repeated_calls() {
        let body = "Email: first@x.com\nEmail: second@y.com";
        let first = extract_lead_info(body);
        for _ in 0..10 {
            assert_eq!(extract_lead_info(body), first);
        }
        assert_eq!(first.email.as_deref(), Some("first@x.com"));
    }
}
