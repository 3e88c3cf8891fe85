//! Mutual fund folios held outside the demat accounts.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{NUM, RE_ACCOUNT_ANCHOR, RE_MF_ANCHOR, RE_TRANSACTION_HEADER};
use crate::cas_import::rules::{first_match, FieldRule};
use crate::cas_import::{isin_chunks, parse_indian_decimal, ParseContext};
use crate::models::{MutualFundFolio, MutualFundScheme, SchemeType};

static RE_FOLIO_ANCHOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bfolio\s*(?:number|no)").unwrap());

static FOLIO_RULES: Lazy<Vec<FieldRule>> = Lazy::new(|| {
    vec![FieldRule::new(
        r"(?i:Folio\s*(?:Number|No\.?)?)\s*:?\s*([A-Za-z0-9][A-Za-z0-9/-]*)",
        validate_folio,
    )]
});

static RE_AMC_LABELLED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i:AMC(?:\s*Name)?)\s*:\s*(.+?Mutual Fund)\b").unwrap());
static RE_AMC_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b((?:[A-Z][A-Za-z&.'-]*\s+){1,5}Mutual Fund)\b").unwrap()
});

/// ISIN, scheme name, units, NAV, value
fn scheme_pattern(anchored: bool) -> String {
    format!(
        r"^([A-Z]{{2}}[A-Z0-9]{{9}}[0-9])\s+(.+?)\s+({num})\s+({num})\s+({num}){tail}",
        num = NUM,
        tail = if anchored { r"\s*$" } else { r"(?:\s|$)" }
    )
}

static RE_SCHEME: Lazy<Regex> = Lazy::new(|| Regex::new(&scheme_pattern(true)).unwrap());
static RE_SCHEME_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(&scheme_pattern(false)).unwrap());

fn validate_folio(raw: &str) -> Option<String> {
    let folio = raw.trim_end_matches(['/', '-']);
    folio
        .chars()
        .any(|c| c.is_ascii_digit())
        .then(|| folio.to_string())
}

pub fn scheme_type(name: &str) -> SchemeType {
    let name = name.to_lowercase();
    if ["debt", "bond", "liquid"].iter().any(|k| name.contains(k)) {
        SchemeType::Debt
    } else if ["hybrid", "balanced"].iter().any(|k| name.contains(k)) {
        SchemeType::Hybrid
    } else {
        SchemeType::Equity
    }
}

/// Mutual fund section: from its anchor to the next account block or the
/// transaction history
fn mf_section(content: &str) -> Option<&str> {
    let anchor = RE_MF_ANCHOR.find(content)?;
    let rest = &content[anchor.end()..];
    let end = [RE_ACCOUNT_ANCHOR.find(rest), RE_TRANSACTION_HEADER.find(rest)]
        .into_iter()
        .flatten()
        .map(|m| m.start())
        .min()
        .unwrap_or(rest.len());
    Some(&rest[..end])
}

pub fn parse_mutual_funds(content: &str, ctx: &mut ParseContext) -> Vec<MutualFundFolio> {
    match mf_section(content) {
        Some(section) => parse_folios(section, ctx),
        None => {
            ctx.info("mutual_funds", "No mutual fund section", "");
            Vec::new()
        }
    }
}

/// Split the section at folio anchors and parse each folio.
///
/// The AMC name usually sits just before its folio anchor, after the last
/// scheme row of the previous folio.
pub fn parse_folios(section: &str, ctx: &mut ParseContext) -> Vec<MutualFundFolio> {
    let mut starts: Vec<usize> = RE_FOLIO_ANCHOR.find_iter(section).map(|m| m.start()).collect();
    if starts.is_empty() {
        starts.push(0);
    }

    let mut folios = Vec::new();
    let mut lead_in_start = 0;

    for (i, &start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(section.len());
        let region = &section[start..end];
        let lead_in = &section[lead_in_start..start];

        let chunks = isin_chunks(region);
        let header = chunks.first().map_or(region, |(offset, _)| &region[..*offset]);

        let mut schemes = Vec::new();
        let mut rows_end = 0;
        for (offset, chunk) in &chunks {
            match parse_scheme(chunk) {
                Some((scheme, len)) => {
                    rows_end = offset + len;
                    schemes.push(scheme);
                }
                None => ctx.warn("mutual_funds.scheme", "Unrecognized scheme row", chunk.trim()),
            }
        }
        if rows_end > 0 {
            lead_in_start = start + rows_end;
        }

        let folio_number = first_match(&FOLIO_RULES, header);
        let amc = last_amc(lead_in).or_else(|| first_amc(header));

        if folio_number.is_none() && schemes.is_empty() {
            ctx.info("mutual_funds.folio", "Empty folio block skipped", header.trim());
            continue;
        }

        let folio = MutualFundFolio::new(amc, folio_number, schemes);
        log::debug!(
            "[{}] Folio {} ({}): {} schemes, value {}",
            ctx.tracking_id,
            folio.folio_number.as_deref().unwrap_or("?"),
            folio.amc.as_deref().unwrap_or("unknown AMC"),
            folio.schemes().len(),
            folio.value()
        );
        folios.push(folio);
    }

    folios
}

/// Scheme and the length of the matched row within the chunk
fn parse_scheme(chunk: &str) -> Option<(MutualFundScheme, usize)> {
    let caps = RE_SCHEME
        .captures(chunk)
        .or_else(|| RE_SCHEME_PREFIX.captures(chunk))?;
    let name = caps[2].trim().to_string();
    let scheme = MutualFundScheme {
        isin: caps[1].to_string(),
        scheme_type: scheme_type(&name),
        name,
        units: parse_indian_decimal(&caps[3])?,
        nav: caps[4].to_string(),
        value: parse_indian_decimal(&caps[5])?,
    };
    Some((scheme, caps.get(5)?.end()))
}

fn first_amc(text: &str) -> Option<String> {
    [&*RE_AMC_LABELLED, &*RE_AMC_NAME]
        .into_iter()
        .find_map(|re| re.captures(text).map(|c| c[1].trim().to_string()))
}

fn last_amc(text: &str) -> Option<String> {
    [&*RE_AMC_LABELLED, &*RE_AMC_NAME]
        .into_iter()
        .find_map(|re| re.captures_iter(text).last().map(|c| c[1].trim().to_string()))
}
