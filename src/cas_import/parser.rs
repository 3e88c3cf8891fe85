//! CAS parse orchestration.
//!
//! extract pages -> canonicalize -> detect format -> dispatch -> aggregate.
//! Every fatal condition is returned as a [`CasError`]; a partial statement
//! is never returned.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;

use super::detect::detect_format;
use super::loader::{PdfTextExtractor, TextExtractor};
use super::text::join_pages;
use super::{get_parsers, ParseContext, StatementParser};
use crate::config::ParserConfig;
use crate::error::{CasError, Result};
use crate::events::{LogProgress, ParseProgressPayload, ParseStage, ProgressSink};
use crate::models::{ParsedStatement, StatementMeta};

const GENERATED_BY: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// One statement to parse
#[derive(Debug, Clone, Copy)]
pub struct CasInput<'a> {
    pub bytes: &'a [u8],
    pub password: Option<&'a str>,
    pub file_name: Option<&'a str>,
}

impl<'a> CasInput<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            password: None,
            file_name: None,
        }
    }

    pub fn with_password(mut self, password: &'a str) -> Self {
        self.password = Some(password);
        self
    }

    pub fn with_file_name(mut self, file_name: &'a str) -> Self {
        self.file_name = Some(file_name);
        self
    }
}

/// Statement parser entry point. Holds no per-call state, share it freely.
pub struct CasParser<E: TextExtractor = PdfTextExtractor> {
    extractor: E,
    config: ParserConfig,
    parsers: Vec<Box<dyn StatementParser>>,
}

impl CasParser<PdfTextExtractor> {
    pub fn new() -> Self {
        Self::with_extractor(PdfTextExtractor::new())
    }
}

impl Default for CasParser<PdfTextExtractor> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: TextExtractor> CasParser<E> {
    pub fn with_extractor(extractor: E) -> Self {
        Self {
            extractor,
            config: ParserConfig::default(),
            parsers: get_parsers(),
        }
    }

    pub fn with_config(mut self, config: ParserConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    pub fn parse(&self, input: &CasInput<'_>) -> Result<ParsedStatement> {
        self.parse_with_progress(input, &LogProgress)
    }

    /// Parse and report each completed stage to `progress`
    pub fn parse_with_progress(
        &self,
        input: &CasInput<'_>,
        progress: &dyn ProgressSink,
    ) -> Result<ParsedStatement> {
        let started = Instant::now();
        let mut ctx = ParseContext::new();
        let tracking_id = ctx.tracking_id.clone();
        let emit = |stage: ParseStage, message: String| {
            progress.emit(&ParseProgressPayload::completed(&tracking_id, stage, message));
        };

        log::info!(
            "[{}] Parsing CAS {} ({} bytes)",
            tracking_id,
            input.file_name.unwrap_or("<memory>"),
            input.bytes.len()
        );

        let pages = self
            .extractor
            .extract_pages(input.bytes, input.password)
            .map_err(|e| {
                log::warn!("[{}] Text extraction failed: {}", tracking_id, e);
                e
            })?;
        let content = join_pages(&pages);
        let length = content.chars().count();
        if length < self.config.min_text_length {
            log::warn!(
                "[{}] Only {} characters of text extracted from {} pages",
                tracking_id,
                length,
                pages.len()
            );
            return Err(CasError::InsufficientText {
                length,
                minimum: self.config.min_text_length,
            });
        }
        emit(
            ParseStage::TextExtracting,
            format!("Extracted {} characters from {} pages", length, pages.len()),
        );

        let parser = detect_format(&content, &self.parsers).ok_or_else(|| {
            log::warn!("[{}] No CAS format detected", tracking_id);
            CasError::UnrecognizedFormat
        })?;
        let format = parser.format();
        emit(ParseStage::FormatDetecting, format!("Detected {} statement", format));
        emit(ParseStage::Dispatching, format!("Dispatching to {} parser", format));

        let extracted = parser.parse(&content, &mut ctx)?;
        if extracted.is_empty() {
            log::warn!("[{}] {} statement yielded no accounts or folios", tracking_id, format);
            return Err(CasError::FormatParseFailure { format });
        }
        emit(
            ParseStage::SectionParsing,
            format!(
                "Found {} demat accounts and {} mutual fund folios",
                extracted.demat_accounts.len(),
                extracted.mutual_funds.len()
            ),
        );

        let meta = StatementMeta {
            format,
            tracking_id: tracking_id.clone(),
            file_name: input.file_name.map(str::to_string),
            file_size: input.bytes.len(),
            page_count: pages.len(),
            elapsed_ms: started.elapsed().as_millis() as u64,
            generated_by: GENERATED_BY.to_string(),
            parsed_at: Utc::now(),
            statement_period: extracted.statement_period,
            warnings: ctx.warnings,
            raw_text: self.config.keep_raw_text.then(|| content.clone()),
        };
        let statement = ParsedStatement::new(
            extracted.investor,
            extracted.demat_accounts,
            extracted.mutual_funds,
            meta,
        );
        emit(
            ParseStage::Aggregating,
            format!("Total value {}", statement.summary().total_value),
        );

        log::info!(
            "[{}] Parsed {} statement in {} ms: total value {}, {} warnings",
            tracking_id,
            format,
            statement.meta.elapsed_ms,
            statement.summary().total_value,
            statement.meta.warnings.len()
        );
        emit(ParseStage::Done, "Parse complete".to_string());

        Ok(statement)
    }
}

/// Run a parse on the blocking thread pool
pub async fn parse_async<E>(
    parser: Arc<CasParser<E>>,
    bytes: Vec<u8>,
    password: Option<String>,
    file_name: Option<String>,
) -> Result<ParsedStatement>
where
    E: TextExtractor + 'static,
{
    tokio::task::spawn_blocking(move || {
        let input = CasInput {
            bytes: &bytes,
            password: password.as_deref(),
            file_name: file_name.as_deref(),
        };
        parser.parse(&input)
    })
    .await
    .map_err(|e| CasError::UnreadableDocument(format!("Parse task failed: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cas_import::cdsl::fixtures::SAMPLE_CAS;
    use crate::error::CasErrorKind;
    use crate::models::{AssetClass, CasFormat};
    use rust_decimal::Decimal;
    use std::cell::RefCell;
    use std::str::FromStr;

    struct FakeExtractor {
        pages: Vec<String>,
    }

    impl FakeExtractor {
        fn new(pages: &[&str]) -> Self {
            Self {
                pages: pages.iter().map(|p| p.to_string()).collect(),
            }
        }
    }

    impl TextExtractor for FakeExtractor {
        fn extract_pages(&self, _bytes: &[u8], _password: Option<&str>) -> Result<Vec<String>> {
            Ok(self.pages.clone())
        }
    }

    /// Behaves like an encrypted statement opened with the PAN as password
    struct LockedExtractor;

    impl TextExtractor for LockedExtractor {
        fn extract_pages(&self, _bytes: &[u8], password: Option<&str>) -> Result<Vec<String>> {
            match password {
                Some("ABCDE1234F") => Ok(vec![SAMPLE_CAS.to_string()]),
                _ => Err(CasError::WrongPassword),
            }
        }
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn parse_pages(pages: &[&str]) -> Result<ParsedStatement> {
        CasParser::with_extractor(FakeExtractor::new(pages)).parse(&CasInput::new(b"%PDF-1.4"))
    }

    const SINGLE_ACCOUNT_PAGE_1: &str = "CDSL Consolidated Account Statement\n\
        Investor Name : TEST USER PAN : ABCDE1234F\n\
        DP Name : TEST BROKING LTD DP ID : 12345678 Client ID : 87654321\n";
    const SINGLE_ACCOUNT_PAGE_2: &str = "HOLDING STATEMENT AS ON 31-01-2024\n\
        INE123456789 TEST CO LTD 100 0 0 0 100 500.00 50,000.00\n\
        Portfolio Value : 50,000.00\n";

    #[test]
    fn test_single_account_across_pages() {
        let statement = parse_pages(&[SINGLE_ACCOUNT_PAGE_1, SINGLE_ACCOUNT_PAGE_2]).unwrap();

        assert_eq!(statement.demat_accounts().len(), 1);
        let account = &statement.demat_accounts()[0];
        assert_eq!(account.dp_id.as_deref(), Some("12345678"));
        assert_eq!(account.client_id.as_deref(), Some("87654321"));
        assert_eq!(account.value(), dec("50000"));

        let equities = account.holdings().bucket(AssetClass::Equity);
        assert_eq!(equities.len(), 1);
        assert_eq!(equities[0].isin, "INE123456789");
        assert_eq!(equities[0].units, dec("100"));
        assert_eq!(equities[0].value, dec("50000"));

        assert_eq!(statement.meta.page_count, 2);
        assert_eq!(statement.meta.format, CasFormat::Cdsl);
        assert_eq!(statement.summary().total_value, dec("50000"));
    }

    #[test]
    fn test_demat_only_statement_with_transaction_history() {
        let history = "STATEMENT OF TRANSACTIONS FOR THE PERIOD 01-Jan-2024 TO 31-Jan-2024\n\
            DP Name : TEST BROKING LTD DP ID : 12345678 Client ID : 87654321\n\
            STATEMENT OF TRANSACTIONS\n\
            INE123456789 TEST CO LTD 05-Jan-2024 BY MARKET PURCHASE 100.000 0.000 100.000\n";
        let statement =
            parse_pages(&[SINGLE_ACCOUNT_PAGE_1, SINGLE_ACCOUNT_PAGE_2, history]).unwrap();

        assert_eq!(statement.demat_accounts().len(), 1);
        assert!(statement.mutual_funds().is_empty());
        assert_eq!(statement.demat_accounts()[0].holdings().len(), 1);
        assert_eq!(statement.demat_accounts()[0].value(), dec("50000"));
        assert_eq!(statement.summary().total_value, dec("50000"));
    }

    #[test]
    fn test_unrecognized_format() {
        let text = "Annual report of a manufacturing company. Revenue grew in all \
            segments during the year and the board recommends a final dividend.";
        let err = parse_pages(&[text]).unwrap_err();
        assert_eq!(err.kind(), CasErrorKind::UnrecognizedFormat);
    }

    #[test]
    fn test_wrong_password_emits_no_progress() {
        let parser = CasParser::with_extractor(LockedExtractor);
        let seen = RefCell::new(Vec::new());
        let sink = |p: &ParseProgressPayload| seen.borrow_mut().push(p.stage);

        let err = parser
            .parse_with_progress(&CasInput::new(b"%PDF-1.4"), &sink)
            .unwrap_err();
        assert!(matches!(err, CasError::WrongPassword));
        assert!(seen.borrow().is_empty());

        let err = parser
            .parse_with_progress(&CasInput::new(b"%PDF-1.4").with_password("WRONG0000X"), &sink)
            .unwrap_err();
        assert_eq!(err.kind(), CasErrorKind::WrongPassword);

        let statement = parser
            .parse(&CasInput::new(b"%PDF-1.4").with_password("ABCDE1234F"))
            .unwrap();
        assert_eq!(statement.demat_accounts().len(), 2);
    }

    #[test]
    fn test_mutual_funds_only() {
        let text = "NSDL CDSL Consolidated Account Statement for the period from \
            01-Jan-2024 to 31-Jan-2024 MUTUAL FUND UNITS HELD AS ON 31-Jan-2024 \
            Axis Mutual Fund Folio No : 9102 \
            INF846K01DP8 AXIS BLUECHIP FUND 10 100.00 1,000.00 \
            INF846K01EW2 AXIS LIQUID FUND 1 2000.00 2,000.00";
        let statement = parse_pages(&[text]).unwrap();

        assert!(statement.demat_accounts().is_empty());
        assert_eq!(statement.mutual_funds().len(), 1);
        assert_eq!(statement.mutual_funds()[0].value(), dec("3000"));
        assert_eq!(statement.mutual_funds()[0].amc.as_deref(), Some("Axis Mutual Fund"));
        assert_eq!(statement.summary().accounts.mutual_funds.total_value, dec("3000"));
        assert_eq!(statement.summary().total_value, dec("3000"));
    }

    #[test]
    fn test_insufficient_text() {
        let err = parse_pages(&["CDSL DP ID", "   \n  "]).unwrap_err();
        match err {
            CasError::InsufficientText { length, minimum } => {
                assert_eq!(length, 10);
                assert_eq!(minimum, 100);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_detected_but_empty_is_parse_failure() {
        let text = "CDSL Consolidated Account Statement DP Name : LONELY BROKING LTD \
            DP ID : 12345678 but the rest of this statement could not be read at all.";
        let err = parse_pages(&[text]).unwrap_err();
        assert!(matches!(
            err,
            CasError::FormatParseFailure {
                format: CasFormat::Cdsl
            }
        ));
    }

    #[test]
    fn test_sample_statement_totals() {
        let statement = parse_pages(&[SAMPLE_CAS]).unwrap();
        let summary = statement.summary();

        assert_eq!(summary.accounts.demat.count, 2);
        assert_eq!(summary.accounts.demat.total_value, dec("83142.75"));
        assert_eq!(summary.accounts.mutual_funds.count, 2);
        assert_eq!(summary.accounts.mutual_funds.total_value, dec("32739.83"));
        assert_eq!(summary.holdings.equities.count, 4);
        assert_eq!(summary.holdings.demat_mutual_funds.count, 1);
        assert_eq!(summary.holdings.government_securities.count, 0);
        assert_eq!(summary.total_value, dec("115882.58"));

        let demat_sum: Decimal = statement.demat_accounts().iter().map(|a| a.value()).sum();
        let mf_sum: Decimal = statement.mutual_funds().iter().map(|f| f.value()).sum();
        assert_eq!(summary.total_value, demat_sum + mf_sum);

        assert_eq!(statement.investor.name.as_deref(), Some("RAHUL KUMAR SHARMA"));
        assert!(statement.meta.statement_period.is_some());
        assert!(!statement.meta.tracking_id.is_empty());
        assert!(statement.meta.generated_by.starts_with("cas-parser/"));
    }

    #[test]
    fn test_serialized_totals_are_exact_and_rederived() {
        let statement = parse_pages(&[SAMPLE_CAS]).unwrap();
        let json = serde_json::to_string(&statement).unwrap();
        assert!(json.contains(r#""total_value":115882.58"#));

        let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
        value["summary"]["total_value"] = serde_json::json!(1);
        value["demat_accounts"][0]["value"] = serde_json::json!(0);
        value["mutual_funds"][0]["value"] = serde_json::json!(0);

        let restored: ParsedStatement = serde_json::from_value(value).unwrap();
        assert_eq!(restored.summary(), statement.summary());
        assert_eq!(restored.demat_accounts()[0].value(), dec("55638.75"));
        assert_eq!(restored.mutual_funds()[0].value(), dec("26727.83"));
    }

    #[test]
    fn test_progress_is_monotonic() {
        let parser = CasParser::with_extractor(FakeExtractor::new(&[SAMPLE_CAS]));
        let seen = RefCell::new(Vec::new());
        let sink = |p: &ParseProgressPayload| seen.borrow_mut().push((p.percent, p.tracking_id.clone()));

        let statement = parser
            .parse_with_progress(&CasInput::new(b"%PDF-1.4"), &sink)
            .unwrap();

        let seen = seen.into_inner();
        assert_eq!(seen.len(), 6);
        assert!(seen.windows(2).all(|w| w[0].0 < w[1].0));
        assert_eq!(seen.last().map(|(p, _)| *p), Some(100));
        assert!(seen.iter().all(|(_, id)| *id == statement.meta.tracking_id));
    }

    #[test]
    fn test_raw_text_is_opt_in() {
        let statement = parse_pages(&[SAMPLE_CAS]).unwrap();
        assert!(statement.meta.raw_text.is_none());
        let json = serde_json::to_value(&statement).unwrap();
        assert!(json["meta"].get("raw_text").is_none());
        assert!(json["summary"]["total_value"].is_number());

        let config = ParserConfig {
            keep_raw_text: true,
            ..ParserConfig::default()
        };
        let statement = CasParser::with_extractor(FakeExtractor::new(&[SAMPLE_CAS]))
            .with_config(config)
            .parse(&CasInput::new(b"%PDF-1.4").with_file_name("cas.pdf"))
            .unwrap();
        let raw = statement.meta.raw_text.unwrap();
        assert!(raw.starts_with("Consolidated Account Statement CDSL"));
        assert_eq!(statement.meta.file_name.as_deref(), Some("cas.pdf"));
    }

    #[tokio::test]
    async fn test_parse_async() {
        let parser = Arc::new(CasParser::with_extractor(FakeExtractor::new(&[SAMPLE_CAS])));
        let statement = parse_async(parser, b"%PDF-1.4".to_vec(), None, None)
            .await
            .unwrap();
        assert_eq!(statement.mutual_funds().len(), 2);

        let locked = Arc::new(CasParser::with_extractor(LockedExtractor));
        let err = parse_async(locked, b"%PDF-1.4".to_vec(), None, Some("cas.pdf".to_string()))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), CasErrorKind::WrongPassword);
    }
}
