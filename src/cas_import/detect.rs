//! Statement format detection via weighted keyword evidence.

use super::StatementParser;
use crate::models::CasFormat;

/// Fixed keyword evidence for one source format
#[derive(Debug, Clone, Copy)]
pub struct KeywordProbe {
    pub format: CasFormat,
    pub keywords: &'static [(&'static str, u32)],
    pub threshold: u32,
}

/// Depository CAS: any two of the five keywords. A single hit is not enough,
/// "DP ID" alone shows up in ordinary broker contract notes.
pub const CDSL_PROBE: KeywordProbe = KeywordProbe {
    format: CasFormat::Cdsl,
    keywords: &[
        ("CDSL", 1),
        ("NSDL", 1),
        ("DP Name", 1),
        ("DP ID", 1),
        ("BO ID", 1),
    ],
    threshold: 2,
};

impl KeywordProbe {
    /// Sum of weights of keywords present in the text
    pub fn evidence(&self, content: &str) -> u32 {
        self.keywords
            .iter()
            .filter(|(keyword, _)| content.contains(keyword))
            .map(|(_, weight)| weight)
            .sum()
    }

    pub fn matches(&self, content: &str) -> bool {
        self.evidence(content) >= self.threshold
    }
}

/// First registered parser whose probe accepts the text
pub fn detect_format<'a>(
    content: &str,
    parsers: &'a [Box<dyn StatementParser>],
) -> Option<&'a dyn StatementParser> {
    parsers
        .iter()
        .find(|parser| parser.detect(content))
        .map(|parser| &**parser)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cas_import::get_parsers;

    #[test]
    fn test_evidence_counts_distinct_keywords() {
        assert_eq!(CDSL_PROBE.evidence("nothing relevant here"), 0);
        assert_eq!(CDSL_PROBE.evidence("DP ID 12345678 DP ID 87654321"), 1);
        assert_eq!(CDSL_PROBE.evidence("CDSL DP Name DP ID BO ID NSDL"), 5);
    }

    #[test]
    fn test_single_keyword_is_not_enough() {
        assert!(!CDSL_PROBE.matches("Contract note DP ID 12345678"));
        assert!(CDSL_PROBE.matches("Central Depository Services (CDSL) DP ID 12345678"));
    }

    #[test]
    fn test_detect_format() {
        let parsers = get_parsers();
        let text = "Consolidated Account Statement CDSL DP Name : ABC DP ID : 12345678";
        let parser = detect_format(text, &parsers).unwrap();
        assert_eq!(parser.format(), CasFormat::Cdsl);

        assert!(detect_format("Annual report of a steel company", &parsers).is_none());
    }

    #[test]
    fn test_detection_is_deterministic() {
        let parsers = get_parsers();
        let text = "BO ID 1234567812345678 NSDL";
        let first = detect_format(text, &parsers).map(|p| p.format());
        for _ in 0..5 {
            assert_eq!(detect_format(text, &parsers).map(|p| p.format()), first);
        }
    }
}
