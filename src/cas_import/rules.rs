//! Ordered field extraction rules.
//!
//! Each field owns a list of `(pattern, validator)` rules. The first rule whose
//! pattern matches decides the field: its validator either accepts the capture
//! or leaves the field empty. Later rules only run when earlier patterns find
//! nothing, so a rejected value is never replaced by some other look-alike.

use once_cell::sync::Lazy;
use regex::Regex;

/// Validator: returns the cleaned value, or `None` to reject the capture
pub type Validator = fn(&str) -> Option<String>;

pub struct FieldRule {
    pattern: Regex,
    validate: Validator,
}

impl FieldRule {
    /// Patterns are compile-time constants; an invalid one is a programming error.
    pub fn new(pattern: &str, validate: Validator) -> Self {
        Self {
            pattern: Regex::new(pattern).unwrap(),
            validate,
        }
    }

    /// Raw first capture group of the first match
    pub fn capture<'t>(&self, text: &'t str) -> Option<&'t str> {
        self.pattern
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }
}

/// Run rules in order; the first matching pattern decides the field
pub fn first_match(rules: &[FieldRule], text: &str) -> Option<String> {
    let (rule, raw) = rules
        .iter()
        .find_map(|rule| rule.capture(text).map(|raw| (rule, raw)))?;
    (rule.validate)(raw)
}

static RE_PAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z]{5}[0-9]{4}[A-Z]$").unwrap());
static RE_EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(?:\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}$").unwrap());

/// Whitespace-collapsed text with at least one letter
pub fn clean_text(raw: &str) -> Option<String> {
    let cleaned = raw
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_matches(|c: char| c == ',' || c == ':' || c == '-' || c == ' ')
        .to_string();
    if cleaned.chars().any(|c| c.is_alphabetic()) {
        Some(cleaned)
    } else {
        None
    }
}

/// Any non-empty token
pub fn clean_token(raw: &str) -> Option<String> {
    let token = raw.trim();
    (!token.is_empty()).then(|| token.to_string())
}

/// PAN: 5 letters, 4 digits, 1 letter
pub fn validate_pan(raw: &str) -> Option<String> {
    let pan = raw.trim().to_ascii_uppercase();
    RE_PAN.is_match(&pan).then_some(pan)
}

/// PIN code: 6 digits, first digit non-zero
pub fn validate_pincode(raw: &str) -> Option<String> {
    let pin = raw.trim();
    let valid = pin.len() == 6
        && pin.chars().all(|c| c.is_ascii_digit())
        && !pin.starts_with('0');
    valid.then(|| pin.to_string())
}

/// Indian mobile number, normalized to 10 digits.
///
/// Masked numbers (`98XXXXXX10`, `******3210`) are rejected outright.
pub fn validate_mobile(raw: &str) -> Option<String> {
    if raw.chars().any(|c| matches!(c, 'X' | 'x' | '*')) {
        return None;
    }
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    let number = match digits.len() {
        10 => digits.as_str(),
        11 if digits.starts_with('0') => &digits[1..],
        12 if digits.starts_with("91") => &digits[2..],
        _ => return None,
    };
    let valid = number.len() == 10 && matches!(number.as_bytes()[0], b'6'..=b'9');
    valid.then(|| number.to_string())
}

pub fn validate_email(raw: &str) -> Option<String> {
    let email = raw.trim().trim_end_matches('.');
    RE_EMAIL.is_match(email).then(|| email.to_ascii_lowercase())
}

/// Yes/No style flags
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "yes" | "y" | "true" => Some(true),
        "no" | "n" | "false" => Some(false),
        _ => None,
    }
}
