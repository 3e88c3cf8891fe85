//! CDSL Consolidated Account Statement Parser
//!
//! Layout (after canonicalization, in document order):
//! investor preamble, one block per demat account (`DP Name ... DP ID ...
//! Client ID ...` header followed by a `HOLDING STATEMENT` table), the mutual
//! fund section (`MUTUAL FUND UNITS HELD ...`), and finally the transaction
//! history, where each account header is repeated directly before a
//! `STATEMENT OF TRANSACTIONS` table.

pub mod accounts;
pub mod holdings;
pub mod investor;
pub mod mutual_funds;

use once_cell::sync::Lazy;
use regex::Regex;

use super::detect::{KeywordProbe, CDSL_PROBE};
use super::{ExtractedStatement, ParseContext, StatementParser};
use crate::error::Result;
use crate::models::CasFormat;

/// Start of every demat account block
pub(crate) static RE_ACCOUNT_ANCHOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bDP Name\b").unwrap());
pub(crate) static RE_MF_ANCHOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bmutual fund (?:units held|folios)\b").unwrap());
pub(crate) static RE_TRANSACTION_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bstatement of transactions\b").unwrap());
pub(crate) static RE_HOLDING_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bholding statement\b").unwrap());
pub(crate) static RE_HOLDING_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bportfolio value\b").unwrap());

/// Numeric column: 1,23,456.789
pub(crate) const NUM: &str = r"-?[0-9][0-9,]*(?:\.[0-9]+)?";
/// Unused balance column: a number, a dash placeholder or NA
pub(crate) const PLACEHOLDER: &str = r"(?:-?[0-9][0-9,]*(?:\.[0-9]+)?|-{1,2}|NA)";

pub struct CdslParser {
    probe: KeywordProbe,
}

impl CdslParser {
    pub fn new() -> Self {
        Self { probe: CDSL_PROBE }
    }
}

impl Default for CdslParser {
    fn default() -> Self {
        Self::new()
    }
}

impl StatementParser for CdslParser {
    fn detect(&self, content: &str) -> bool {
        self.probe.matches(content)
    }

    fn parse(&self, content: &str, ctx: &mut ParseContext) -> Result<ExtractedStatement> {
        let investor = investor::extract_investor(investor::preamble(content), ctx);
        let statement_period = investor::extract_statement_period(content, ctx);
        let demat_accounts = accounts::parse_demat_accounts(content, ctx);
        let mutual_funds = mutual_funds::parse_mutual_funds(content, ctx);

        log::info!(
            "[{}] CDSL: {} demat accounts, {} mutual fund folios",
            ctx.tracking_id,
            demat_accounts.len(),
            mutual_funds.len()
        );

        Ok(ExtractedStatement {
            investor,
            statement_period,
            demat_accounts,
            mutual_funds,
        })
    }

    fn format(&self) -> CasFormat {
        self.probe.format
    }
}
