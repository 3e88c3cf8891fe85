//! Parsed statement records.
//!
//! Every extractor returns one of these concrete types. Field names serialize
//! as snake_case and form the JSON contract for downstream consumers.
//!
//! Derived values (account and folio values, the statement summary) have no
//! setters and are recomputed when a record is deserialized.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::cas_import::summary::summarize;

/// Known CAS source layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CasFormat {
    #[serde(rename = "CDSL")]
    Cdsl,
}

impl CasFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cdsl => "CDSL",
        }
    }
}

impl fmt::Display for CasFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Depository holding a demat account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DepositoryType {
    #[serde(rename = "CDSL")]
    Cdsl,
}

/// Investor identity from the statement preamble
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Investor {
    pub name: Option<String>,
    pub pan: Option<String>,
    pub address: Option<String>,
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub cas_id: Option<String>,
    pub pincode: Option<String>,
}

/// Asset bucket a holding row is classified into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    Equity,
    DematMutualFund,
    CorporateBond,
    GovernmentSecurity,
    Aif,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoldingInfo {
    pub market_price: Option<Decimal>,
    pub free_balance: Option<Decimal>,
}

/// A single security position inside a demat account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holding {
    pub isin: String,
    pub name: String,
    pub units: Decimal,
    pub value: Decimal,
    pub additional_info: HoldingInfo,
}

/// Holdings of one demat account, grouped by asset class
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holdings {
    pub equities: Vec<Holding>,
    pub demat_mutual_funds: Vec<Holding>,
    pub corporate_bonds: Vec<Holding>,
    pub government_securities: Vec<Holding>,
    pub aifs: Vec<Holding>,
}

impl Holdings {
    pub fn push(&mut self, class: AssetClass, holding: Holding) {
        self.bucket_mut(class).push(holding);
    }

    pub fn bucket(&self, class: AssetClass) -> &[Holding] {
        match class {
            AssetClass::Equity => &self.equities,
            AssetClass::DematMutualFund => &self.demat_mutual_funds,
            AssetClass::CorporateBond => &self.corporate_bonds,
            AssetClass::GovernmentSecurity => &self.government_securities,
            AssetClass::Aif => &self.aifs,
        }
    }

    fn bucket_mut(&mut self, class: AssetClass) -> &mut Vec<Holding> {
        match class {
            AssetClass::Equity => &mut self.equities,
            AssetClass::DematMutualFund => &mut self.demat_mutual_funds,
            AssetClass::CorporateBond => &mut self.corporate_bonds,
            AssetClass::GovernmentSecurity => &mut self.government_securities,
            AssetClass::Aif => &mut self.aifs,
        }
    }

    /// All holdings in bucket order
    pub fn iter(&self) -> impl Iterator<Item = &Holding> {
        self.equities
            .iter()
            .chain(&self.demat_mutual_funds)
            .chain(&self.corporate_bonds)
            .chain(&self.government_securities)
            .chain(&self.aifs)
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn total_value(&self) -> Decimal {
        self.iter().map(|h| h.value).sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DematAccountInfo {
    pub active: Option<bool>,
    pub status: Option<String>,
    pub bsda: Option<bool>,
    pub nominee: Option<String>,
    pub email: Option<String>,
}

/// A depository account with its holdings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "DematAccountRecord")]
pub struct DematAccount {
    pub dp_id: Option<String>,
    pub dp_name: Option<String>,
    pub bo_id: Option<String>,
    pub client_id: Option<String>,
    pub demat_type: DepositoryType,
    holdings: Holdings,
    pub additional_info: DematAccountInfo,
    value: Decimal,
}

#[derive(Deserialize)]
struct DematAccountRecord {
    dp_id: Option<String>,
    dp_name: Option<String>,
    bo_id: Option<String>,
    client_id: Option<String>,
    demat_type: DepositoryType,
    holdings: Holdings,
    additional_info: DematAccountInfo,
}

impl From<DematAccountRecord> for DematAccount {
    fn from(record: DematAccountRecord) -> Self {
        Self::new(
            record.demat_type,
            record.dp_id,
            record.dp_name,
            record.client_id,
            record.bo_id,
            record.holdings,
            record.additional_info,
        )
    }
}

impl DematAccount {
    /// Build an account; `value` is derived from the holdings.
    pub fn new(
        demat_type: DepositoryType,
        dp_id: Option<String>,
        dp_name: Option<String>,
        client_id: Option<String>,
        bo_id: Option<String>,
        holdings: Holdings,
        additional_info: DematAccountInfo,
    ) -> Self {
        let value = holdings.total_value();
        Self {
            dp_id,
            dp_name,
            bo_id,
            client_id,
            demat_type,
            holdings,
            additional_info,
            value,
        }
    }

    pub fn holdings(&self) -> &Holdings {
        &self.holdings
    }

    /// Sum of every holding value
    pub fn value(&self) -> Decimal {
        self.value
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemeType {
    Equity,
    Debt,
    Hybrid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutualFundScheme {
    pub isin: String,
    pub name: String,
    pub units: Decimal,
    /// NAV exactly as printed on the statement
    pub nav: String,
    pub value: Decimal,
    pub scheme_type: SchemeType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "MutualFundFolioRecord")]
pub struct MutualFundFolio {
    pub amc: Option<String>,
    pub folio_number: Option<String>,
    pub registrar: Option<String>,
    schemes: Vec<MutualFundScheme>,
    value: Decimal,
}

#[derive(Deserialize)]
struct MutualFundFolioRecord {
    amc: Option<String>,
    folio_number: Option<String>,
    registrar: Option<String>,
    schemes: Vec<MutualFundScheme>,
}

impl From<MutualFundFolioRecord> for MutualFundFolio {
    fn from(record: MutualFundFolioRecord) -> Self {
        let mut folio = Self::new(record.amc, record.folio_number, record.schemes);
        folio.registrar = record.registrar;
        folio
    }
}

impl MutualFundFolio {
    pub fn new(
        amc: Option<String>,
        folio_number: Option<String>,
        schemes: Vec<MutualFundScheme>,
    ) -> Self {
        let value = schemes.iter().map(|s| s.value).sum();
        Self {
            amc,
            folio_number,
            registrar: None,
            schemes,
            value,
        }
    }

    pub fn schemes(&self) -> &[MutualFundScheme] {
        &self.schemes
    }

    /// Sum of every scheme value
    pub fn value(&self) -> Decimal {
        self.value
    }
}

/// Reserved for insurance statements; never populated by the CDSL parser
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsurancePolicy {
    pub insurer: Option<String>,
    pub policy_number: Option<String>,
    pub value: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementPeriod {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

/// Warning severity for non-fatal extraction problems
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningSeverity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseWarning {
    pub severity: WarningSeverity,
    pub field: String,
    pub message: String,
    pub raw_value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatementMeta {
    pub format: CasFormat,
    pub tracking_id: String,
    pub file_name: Option<String>,
    pub file_size: usize,
    pub page_count: usize,
    pub elapsed_ms: u64,
    pub generated_by: String,
    pub parsed_at: DateTime<Utc>,
    pub statement_period: Option<StatementPeriod>,
    pub warnings: Vec<ParseWarning>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketSummary {
    pub count: usize,
    pub total_value: Decimal,
}

impl BucketSummary {
    pub fn add(&mut self, value: Decimal) {
        self.count += 1;
        self.total_value += value;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountsSummary {
    pub demat: BucketSummary,
    pub mutual_funds: BucketSummary,
    pub insurance: BucketSummary,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoldingsSummary {
    pub equities: BucketSummary,
    pub demat_mutual_funds: BucketSummary,
    pub corporate_bonds: BucketSummary,
    pub government_securities: BucketSummary,
    pub aifs: BucketSummary,
}

/// Derived totals; only ever produced by [`summarize`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub accounts: AccountsSummary,
    pub holdings: HoldingsSummary,
    pub total_value: Decimal,
}

/// Result of a successful CAS parse
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "ParsedStatementRecord")]
pub struct ParsedStatement {
    pub investor: Investor,
    demat_accounts: Vec<DematAccount>,
    mutual_funds: Vec<MutualFundFolio>,
    insurance: Vec<InsurancePolicy>,
    pub meta: StatementMeta,
    summary: Summary,
}

#[derive(Deserialize)]
struct ParsedStatementRecord {
    investor: Investor,
    demat_accounts: Vec<DematAccount>,
    mutual_funds: Vec<MutualFundFolio>,
    #[serde(default)]
    insurance: Vec<InsurancePolicy>,
    meta: StatementMeta,
}

impl From<ParsedStatementRecord> for ParsedStatement {
    fn from(record: ParsedStatementRecord) -> Self {
        let summary = summarize(&record.demat_accounts, &record.mutual_funds, &record.insurance);
        Self {
            investor: record.investor,
            demat_accounts: record.demat_accounts,
            mutual_funds: record.mutual_funds,
            insurance: record.insurance,
            meta: record.meta,
            summary,
        }
    }
}

impl ParsedStatement {
    pub fn new(
        investor: Investor,
        demat_accounts: Vec<DematAccount>,
        mutual_funds: Vec<MutualFundFolio>,
        meta: StatementMeta,
    ) -> Self {
        let insurance = Vec::new();
        let summary = summarize(&demat_accounts, &mutual_funds, &insurance);
        Self {
            investor,
            demat_accounts,
            mutual_funds,
            insurance,
            meta,
            summary,
        }
    }

    pub fn demat_accounts(&self) -> &[DematAccount] {
        &self.demat_accounts
    }

    pub fn mutual_funds(&self) -> &[MutualFundFolio] {
        &self.mutual_funds
    }

    pub fn insurance(&self) -> &[InsurancePolicy] {
        &self.insurance
    }

    pub fn summary(&self) -> &Summary {
        &self.summary
    }
}
