//! Holding statement rows and asset classification.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::{NUM, PLACEHOLDER, RE_HOLDING_END, RE_HOLDING_HEADER};
use crate::cas_import::{isin_chunks, parse_indian_decimal, ParseContext};
use crate::models::{AssetClass, Holding, HoldingInfo, Holdings};

/// ISIN, name, current balance, frozen / pledge / pledge-setup balances,
/// free balance, market price, value
fn row_pattern(anchored: bool) -> String {
    format!(
        r"^([A-Z]{{2}}[A-Z0-9]{{9}}[0-9])\s+(.+?)\s+({num})\s+({ph})\s+({ph})\s+({ph})\s+({num})\s+({num})\s+({num}){tail}",
        num = NUM,
        ph = PLACEHOLDER,
        tail = if anchored { r"\s*$" } else { r"(?:\s|$)" }
    )
}

static RE_ROW: Lazy<Regex> = Lazy::new(|| Regex::new(&row_pattern(true)).unwrap());
static RE_ROW_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(&row_pattern(false)).unwrap());

/// Bucket for a holding row
pub fn classify_holding(isin: &str, name: &str) -> AssetClass {
    let name = name.to_lowercase();
    if isin.starts_with("INE") || name.contains("equity") {
        AssetClass::Equity
    } else if isin.starts_with("INF") || name.contains("etf") {
        AssetClass::DematMutualFund
    } else {
        AssetClass::Equity
    }
}

/// Parse the holding statement of one account section
pub fn parse_holdings(section: &str, ctx: &mut ParseContext) -> Holdings {
    let mut holdings = Holdings::default();

    let Some(header) = RE_HOLDING_HEADER.find(section) else {
        ctx.info("holdings", "No holding statement in account section", "");
        return holdings;
    };
    let body = &section[header.end()..];
    let body = match RE_HOLDING_END.find(body) {
        Some(m) => &body[..m.start()],
        None => body,
    };

    for (_, chunk) in isin_chunks(body) {
        match parse_row(chunk) {
            Some(holding) => {
                let class = classify_holding(&holding.isin, &holding.name);
                holdings.push(class, holding);
            }
            None => ctx.warn("holdings.row", "Unrecognized holding row", chunk.trim()),
        }
    }

    holdings
}

fn parse_row(chunk: &str) -> Option<Holding> {
    let caps = RE_ROW
        .captures(chunk)
        .or_else(|| RE_ROW_PREFIX.captures(chunk))?;
    holding_from(&caps)
}

fn holding_from(caps: &Captures<'_>) -> Option<Holding> {
    Some(Holding {
        isin: caps[1].to_string(),
        name: caps[2].trim().to_string(),
        units: parse_indian_decimal(&caps[3])?,
        value: parse_indian_decimal(&caps[9])?,
        additional_info: HoldingInfo {
            market_price: parse_indian_decimal(&caps[8]),
            free_balance: parse_indian_decimal(&caps[7]),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_classify_holding() {
        assert_eq!(classify_holding("INE002A01018", "RELIANCE"), AssetClass::Equity);
        assert_eq!(
            classify_holding("INF204KB14I2", "NIPPON INDIA ETF NIFTY BEES"),
            AssetClass::DematMutualFund
        );
        assert_eq!(
            classify_holding("INF109K01Z48", "ICICI PRU EQUITY ETF"),
            AssetClass::Equity
        );
        assert_eq!(classify_holding("US0378331005", "SOME ETF"), AssetClass::DematMutualFund);
        assert_eq!(classify_holding("IN0020230085", "GOI 7.18% 2033"), AssetClass::Equity);
    }

    #[test]
    fn test_parse_row_with_numeric_name() {
        let holding =
            parse_row("IN0020230085 GOI 7.18% 2033 5.000 0.000 0.000 0.000 5.000 101.25 506.25 ")
                .unwrap();
        assert_eq!(holding.name, "GOI 7.18% 2033");
        assert_eq!(holding.units, dec("5"));
        assert_eq!(holding.value, dec("506.25"));
        assert_eq!(holding.additional_info.market_price, Some(dec("101.25")));
    }

    #[test]
    fn test_parse_row_with_placeholders() {
        let holding =
            parse_row("INF204KB14I2 NIPPON INDIA ETF NIFTY BEES 20.000 -- -- -- 20.000 250.50 5,010.00")
                .unwrap();
        assert_eq!(holding.units, dec("20"));
        assert_eq!(holding.value, dec("5010.00"));
        assert_eq!(holding.additional_info.free_balance, Some(dec("20")));
    }

    #[test]
    fn test_parse_row_with_trailing_text() {
        let holding = parse_row(
            "INE123456789 ACME INDUSTRIES LTD 100.000 0.000 0.000 0.000 100.000 500.00 50,000.00 Page 2 of 4",
        )
        .unwrap();
        assert_eq!(holding.name, "ACME INDUSTRIES LTD");
        assert_eq!(holding.value, dec("50000"));
    }

    #[test]
    fn test_parse_holdings_buckets_and_warnings() {
        let section = "DP Name : X DP ID : 12345678 Client ID : 87654321 HOLDING STATEMENT \
            INE123456789 ACME LTD 10 0 0 0 10 5.00 50.00 \
            INF204KB14I2 NIFTY ETF 2 NA NA NA 2 25.00 50.00 \
            INE000000011 BROKEN ROW 12 \
            Portfolio Value : 100.00 INE999999991 AFTER THE TABLE 1 0 0 0 1 1 1";
        let mut ctx = ParseContext::new();
        let holdings = parse_holdings(section, &mut ctx);

        assert_eq!(holdings.len(), 2);
        assert_eq!(holdings.bucket(AssetClass::Equity).len(), 1);
        assert_eq!(holdings.bucket(AssetClass::DematMutualFund).len(), 1);
        assert_eq!(holdings.total_value(), dec("100"));
        assert_eq!(ctx.warnings.len(), 1);
        assert_eq!(ctx.warnings[0].raw_value, "INE000000011 BROKEN ROW 12");
    }

    #[test]
    fn test_unpopulated_buckets_stay_empty() {
        let section = "HOLDING STATEMENT IN0020230085 GOI 7.18% 2033 5 0 0 0 5 100 500";
        let mut ctx = ParseContext::new();
        let holdings = parse_holdings(section, &mut ctx);
        assert_eq!(holdings.len(), 1);
        assert!(holdings.government_securities.is_empty());
        assert!(holdings.corporate_bonds.is_empty());
        assert!(holdings.aifs.is_empty());
    }
}
