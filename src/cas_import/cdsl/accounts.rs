//! Demat account sections.

use once_cell::sync::Lazy;
use regex::Regex;

use super::holdings::parse_holdings;
use super::{RE_ACCOUNT_ANCHOR, RE_HOLDING_HEADER, RE_MF_ANCHOR, RE_TRANSACTION_HEADER};
use crate::cas_import::rules::{clean_text, clean_token, first_match, parse_flag, validate_email, FieldRule};
use crate::cas_import::ParseContext;
use crate::models::{DematAccount, DematAccountInfo, DepositoryType};

static DP_NAME_RULES: Lazy<Vec<FieldRule>> = Lazy::new(|| {
    vec![FieldRule::new(
        r"\bDP Name\s*:?\s*(.+?)\s+(?:DP ID|Client ID|BO ID)\b",
        clean_text,
    )]
});

static DP_ID_RULES: Lazy<Vec<FieldRule>> = Lazy::new(|| {
    vec![FieldRule::new(r"\bDP ID\s*:?\s*(IN[0-9]{6}|[0-9]{8})\b", clean_token)]
});

static CLIENT_ID_RULES: Lazy<Vec<FieldRule>> = Lazy::new(|| {
    vec![FieldRule::new(r"\bClient ID\s*:?\s*([0-9]{8})\b", clean_token)]
});

static BO_ID_RULES: Lazy<Vec<FieldRule>> = Lazy::new(|| {
    vec![FieldRule::new(r"\bBO ID\s*:?\s*([0-9]{16}|IN[0-9]{14})\b", clean_token)]
});

static STATUS_RULES: Lazy<Vec<FieldRule>> = Lazy::new(|| {
    vec![FieldRule::new(
        r"(?i)\b(?:account\s+)?status\s*:?\s*(active|inactive|frozen|closed|suspended|dormant)\b",
        clean_token,
    )]
});

static NOMINEE_RULES: Lazy<Vec<FieldRule>> = Lazy::new(|| {
    vec![FieldRule::new(
        r"(?i)\bnominee(?:\s*name)?\s*:?\s*(.+?)\s*(?:\b(?:e-?mail|mobile|bsda|account status)\b|$)",
        clean_text,
    )]
});

static EMAIL_RULES: Lazy<Vec<FieldRule>> = Lazy::new(|| {
    vec![FieldRule::new(
        r"(?i)\bE-?mail(?:\s*(?:Id|Address))?\s*[:\-]?\s*(\S+@\S+)",
        validate_email,
    )]
});

static RE_BSDA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bBSDA(?:\s*flag)?\s*:?\s*(yes|no|y|n)\b").unwrap());

/// One demat account block of the canonical text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountSection<'a> {
    pub start: usize,
    pub end: usize,
    pub text: &'a str,
}

/// Cut the canonical text into account sections.
///
/// Each section runs from a `DP Name` anchor to the next anchor, the mutual
/// fund section, the transaction history or the end of text. The history
/// repeats account headers under the same anchor; such a repeat reaches a
/// `STATEMENT OF TRANSACTIONS` header before any holding table and is dropped.
pub fn segment_accounts(content: &str) -> Vec<AccountSection<'_>> {
    let anchors: Vec<usize> = RE_ACCOUNT_ANCHOR.find_iter(content).map(|m| m.start()).collect();
    let terminals: Vec<usize> = RE_MF_ANCHOR.find_iter(content).map(|m| m.start()).collect();

    anchors
        .iter()
        .enumerate()
        .filter_map(|(i, &start)| {
            let next_anchor = anchors.get(i + 1).copied().unwrap_or(content.len());
            let terminal = terminals
                .iter()
                .copied()
                .find(|&t| t > start)
                .unwrap_or(content.len());
            let window = &content[start..next_anchor.min(terminal)];

            let history = RE_TRANSACTION_HEADER.find(window).map(|m| m.start());
            let holdings = RE_HOLDING_HEADER.find(window).map(|m| m.start());
            if let Some(history) = history {
                if holdings.map_or(true, |h| history < h) {
                    return None;
                }
            }

            let end = start + history.unwrap_or(window.len());
            let text = &content[start..end];
            let accepted = text.contains("DP ID") && text.contains("Client ID");
            accepted.then_some(AccountSection { start, end, text })
        })
        .collect()
}

/// Parse every accepted account section in document order
pub fn parse_demat_accounts(content: &str, ctx: &mut ParseContext) -> Vec<DematAccount> {
    segment_accounts(content)
        .into_iter()
        .filter_map(|section| parse_account(&section, ctx))
        .collect()
}

fn parse_account(section: &AccountSection<'_>, ctx: &mut ParseContext) -> Option<DematAccount> {
    let header = match RE_HOLDING_HEADER.find(section.text) {
        Some(m) => &section.text[..m.start()],
        None => section.text,
    };

    let dp_name = first_match(&DP_NAME_RULES, header);
    let dp_id = first_match(&DP_ID_RULES, header);
    if dp_name.is_none() && dp_id.is_none() {
        ctx.warn(
            "demat_account",
            "Account section without DP name or DP ID skipped",
            truncate(header, 80),
        );
        return None;
    }

    let client_id = first_match(&CLIENT_ID_RULES, header);
    let bo_id = first_match(&BO_ID_RULES, header);
    if client_id.is_none() {
        ctx.info("demat_account.client_id", "Client ID not found", truncate(header, 80));
    }

    let status = first_match(&STATUS_RULES, header);
    let additional_info = DematAccountInfo {
        active: status.as_deref().map(|s| s.eq_ignore_ascii_case("active")),
        status,
        bsda: RE_BSDA.captures(header).and_then(|c| parse_flag(&c[1])),
        nominee: first_match(&NOMINEE_RULES, header),
        email: first_match(&EMAIL_RULES, header),
    };

    let holdings = parse_holdings(section.text, ctx);
    let account = DematAccount::new(
        DepositoryType::Cdsl,
        dp_id,
        dp_name,
        client_id,
        bo_id,
        holdings,
        additional_info,
    );

    log::debug!(
        "[{}] Account {} at {}..{}: {} holdings, value {}",
        ctx.tracking_id,
        account.dp_id.as_deref().unwrap_or("?"),
        section.start,
        section.end,
        account.holdings().len(),
        account.value()
    );

    Some(account)
}

/// Char-boundary safe prefix for warning payloads
fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
