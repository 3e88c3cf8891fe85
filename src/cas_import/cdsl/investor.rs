//! Investor identity and statement period.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{RE_ACCOUNT_ANCHOR, RE_MF_ANCHOR};
use crate::cas_import::rules::{
    clean_text, clean_token, first_match, validate_email, validate_mobile, validate_pan,
    validate_pincode, FieldRule,
};
use crate::cas_import::{parse_cas_date, ParseContext};
use crate::models::{Investor, StatementPeriod};

/// Field labels that end a free-text investor field
const FIELD_END: &str = r"(?:PAN|Address|E-?mail|Mobile|CAS ID|PIN)\b";

static NAME_RULES: Lazy<Vec<FieldRule>> = Lazy::new(|| {
    vec![
        FieldRule::new(
            &format!(
                r"(?i)\b(?:investor name|name of (?:the )?(?:first )?holder|first holder)\s*:?\s*(.+?)\s+{}",
                FIELD_END
            ),
            clean_text,
        ),
        FieldRule::new(&format!(r"\bName\s*:\s*(.+?)\s+{}", FIELD_END), clean_text),
    ]
});

static PAN_RULES: Lazy<Vec<FieldRule>> = Lazy::new(|| {
    vec![
        FieldRule::new(
            r"\b(?i:PAN)(?:\s*(?:No\.?|Number))?\s*[:\-]?\s*([A-Za-z0-9]{10})\b",
            validate_pan,
        ),
        FieldRule::new(r"\b([A-Z]{5}[0-9]{4}[A-Z])\b", validate_pan),
    ]
});

static ADDRESS_RULES: Lazy<Vec<FieldRule>> = Lazy::new(|| {
    vec![FieldRule::new(
        r"(?i)\baddress\s*:?\s*(.+?)\s*(?:\bPIN(?:\s*code)?\b|\bE-?mail\b|\bMobile\b|\bCAS ID\b|$)",
        validate_address,
    )]
});

static PINCODE_RULES: Lazy<Vec<FieldRule>> = Lazy::new(|| {
    vec![
        FieldRule::new(r"(?i)\bPIN(?:\s*code)?\s*[:\-]?\s*([0-9]{6})\b", validate_pincode),
        FieldRule::new(r"(?i)\baddress\b.*?\b([0-9]{6})\b", validate_pincode),
    ]
});

static EMAIL_RULES: Lazy<Vec<FieldRule>> = Lazy::new(|| {
    vec![
        FieldRule::new(
            r"(?i)\bE-?mail(?:\s*(?:Id|Address))?\s*[:\-]?\s*(\S+@\S+)",
            validate_email,
        ),
        FieldRule::new(
            r"([A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(?:\.[A-Za-z0-9-]+)+)",
            validate_email,
        ),
    ]
});

static MOBILE_RULES: Lazy<Vec<FieldRule>> = Lazy::new(|| {
    vec![FieldRule::new(
        r"\b(?i:mobile|mob|phone)(?:\s*(?:No\.?|Number))?\s*[:\-]?\s*(\+?[0-9X*][0-9X*\s-]{8,15}[0-9X*])",
        validate_mobile,
    )]
});

static CAS_ID_RULES: Lazy<Vec<FieldRule>> = Lazy::new(|| {
    vec![FieldRule::new(
        r"\b(?i:CAS\s*ID)\s*[:\-]?\s*([A-Z0-9]{6,20})\b",
        clean_token,
    )]
});

static RE_PERIOD: Lazy<Regex> = Lazy::new(|| {
    let date = r"[0-9]{1,2}[-/ ](?:[A-Za-z]{3,9}|[0-9]{1,2})[-/ ][0-9]{4}";
    Regex::new(&format!(
        r"(?i)\bperiod\s*(?:from\s*)?:?\s*({date})\s*(?:to|-)\s*({date})",
        date = date
    ))
    .unwrap()
});

/// Addresses run until the next label; cap the length so a missing label
/// cannot drag the whole preamble in.
fn validate_address(raw: &str) -> Option<String> {
    clean_text(raw).filter(|a| a.len() <= 250)
}

/// Text before the first account block or mutual fund section
pub fn preamble(content: &str) -> &str {
    let end = [RE_ACCOUNT_ANCHOR.find(content), RE_MF_ANCHOR.find(content)]
        .into_iter()
        .flatten()
        .map(|m| m.start())
        .min()
        .unwrap_or(content.len());
    content[..end].trim_end()
}

/// Extract investor fields; each field is independent of the others
pub fn extract_investor(preamble: &str, ctx: &mut ParseContext) -> Investor {
    let investor = Investor {
        name: first_match(&NAME_RULES, preamble),
        pan: first_match(&PAN_RULES, preamble),
        address: first_match(&ADDRESS_RULES, preamble),
        email: first_match(&EMAIL_RULES, preamble),
        mobile: first_match(&MOBILE_RULES, preamble),
        cas_id: first_match(&CAS_ID_RULES, preamble),
        pincode: first_match(&PINCODE_RULES, preamble),
    };

    if investor.name.is_none() {
        ctx.info("investor.name", "Investor name not found", "");
    }
    if investor.pan.is_none() {
        ctx.info("investor.pan", "No valid PAN found", "");
    }

    investor
}

pub fn extract_statement_period(content: &str, ctx: &mut ParseContext) -> Option<StatementPeriod> {
    let caps = RE_PERIOD.captures(content)?;
    let (from, to) = match (parse_cas_date(&caps[1]), parse_cas_date(&caps[2])) {
        (Some(from), Some(to)) => (from, to),
        _ => {
            ctx.warn("statement_period", "Unparseable statement period", &caps[0]);
            return None;
        }
    };

    if from > to {
        ctx.warn("statement_period", "Statement period ends before it starts", &caps[0]);
        return None;
    }

    Some(StatementPeriod { from, to })
}
