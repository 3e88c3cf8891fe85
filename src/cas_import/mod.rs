//! CAS Statement Import Module
//!
//! Parses Consolidated Account Statements (CAS) issued by Indian depositories
//! into typed holdings records.

pub mod cdsl;
pub mod detect;
pub mod loader;
pub mod parser;
pub mod rules;
pub mod summary;
pub mod text;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    CasFormat, DematAccount, Investor, MutualFundFolio, ParseWarning, StatementPeriod,
    WarningSeverity,
};

static RE_ISIN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-Z]{2}[A-Z0-9]{9}[0-9])\b").unwrap());

/// Per-run state threaded through a single parse
#[derive(Debug, Clone)]
pub struct ParseContext {
    pub tracking_id: String,
    pub warnings: Vec<ParseWarning>,
}

impl ParseContext {
    pub fn new() -> Self {
        Self::with_tracking_id(Uuid::new_v4().to_string())
    }

    pub fn with_tracking_id(tracking_id: String) -> Self {
        Self {
            tracking_id,
            warnings: Vec::new(),
        }
    }

    pub fn info(&mut self, field: &str, message: &str, raw_value: &str) {
        self.push(WarningSeverity::Info, field, message, raw_value);
    }

    pub fn warn(&mut self, field: &str, message: &str, raw_value: &str) {
        self.push(WarningSeverity::Warning, field, message, raw_value);
    }

    fn push(&mut self, severity: WarningSeverity, field: &str, message: &str, raw_value: &str) {
        log::debug!("[{}] {}: {} ('{}')", self.tracking_id, field, message, raw_value);
        self.warnings.push(ParseWarning {
            severity,
            field: field.to_string(),
            message: message.to_string(),
            raw_value: raw_value.to_string(),
        });
    }
}

impl Default for ParseContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything a format parser pulls out of the canonical statement text
#[derive(Debug, Clone, Default)]
pub struct ExtractedStatement {
    pub investor: Investor,
    pub statement_period: Option<StatementPeriod>,
    pub demat_accounts: Vec<DematAccount>,
    pub mutual_funds: Vec<MutualFundFolio>,
}

impl ExtractedStatement {
    pub fn is_empty(&self) -> bool {
        self.demat_accounts.is_empty() && self.mutual_funds.is_empty()
    }
}

/// Statement layout parser
pub trait StatementParser: Send + Sync {
    /// Check if this parser can handle the canonical statement text
    fn detect(&self, content: &str) -> bool;

    /// Parse the canonical statement text
    fn parse(&self, content: &str, ctx: &mut ParseContext) -> Result<ExtractedStatement>;

    /// Format tag reported in the statement meta
    fn format(&self) -> CasFormat;
}

/// All available statement parsers, in detection order
pub fn get_parsers() -> Vec<Box<dyn StatementParser>> {
    vec![Box::new(cdsl::CdslParser::new())]
}

/// Parse an Indian-formatted number (1,23,456.78 -> 123456.78)
///
/// Accepts a leading currency marker (`₹`, `Rs.`, `INR`) and a trailing
/// minus or bracketed negative. Placeholders such as `-`, `--` or `NA` give `None`.
pub fn parse_indian_decimal(s: &str) -> Option<Decimal> {
    let mut cleaned = s.trim();
    for prefix in ["₹", "Rs.", "Rs", "INR"] {
        if let Some(rest) = cleaned.strip_prefix(prefix) {
            cleaned = rest.trim_start();
        }
    }

    let (negative, body) = if let Some(inner) = cleaned
        .strip_prefix('(')
        .and_then(|r| r.strip_suffix(')'))
    {
        (true, inner)
    } else if let Some(rest) = cleaned.strip_prefix('-') {
        (true, rest)
    } else {
        (false, cleaned)
    };

    let digits: String = body.chars().filter(|c| *c != ',' && *c != ' ').collect();
    if digits.is_empty() || !digits.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let value = Decimal::from_str(&digits).ok()?;
    Some(if negative { -value } else { value })
}

/// Month number for an English month name or abbreviation
fn month_from_name(name: &str) -> Option<u32> {
    let lower = name.to_ascii_lowercase();
    let month = match lower.get(..3)? {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

/// Parse a CAS date (31-Jan-2024, 31 JAN 2024, 31/Jan/2024, 31-01-2024)
pub fn parse_cas_date(s: &str) -> Option<NaiveDate> {
    let parts: Vec<&str> = s
        .trim()
        .split(|c: char| c == '-' || c == '/' || c == ' ' || c == '.')
        .filter(|p| !p.is_empty())
        .collect();
    if parts.len() != 3 {
        return None;
    }

    let day: u32 = parts[0].parse().ok()?;
    let month = match parts[1].parse::<u32>() {
        Ok(m) => m,
        Err(_) => month_from_name(parts[1])?,
    };
    let year: i32 = parts[2].parse().ok()?;
    if parts[2].len() != 4 {
        return None;
    }

    NaiveDate::from_ymd_opt(year, month, day)
}

/// Check the ISIN shape: 2 letters, 9 alphanumerics, 1 check digit
pub fn is_isin(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() == 12
        && bytes[..2].iter().all(|b| b.is_ascii_uppercase())
        && bytes[2..11]
            .iter()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
        && bytes[11].is_ascii_digit()
}

/// Extract the first ISIN from text
pub fn extract_isin(text: &str) -> Option<String> {
    RE_ISIN.captures(text).map(|c| c[1].to_string())
}

/// Split text into chunks that each start at an ISIN.
///
/// Returns `(offset, chunk)` pairs; text before the first ISIN is skipped.
/// Row patterns are matched per chunk so a malformed row can never swallow
/// the row after it.
pub fn isin_chunks(text: &str) -> Vec<(usize, &str)> {
    let starts: Vec<usize> = RE_ISIN.find_iter(text).map(|m| m.start()).collect();
    starts
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let end = starts.get(i + 1).copied().unwrap_or(text.len());
            (start, &text[start..end])
        })
        .collect()
}
