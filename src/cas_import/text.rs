//! Canonical statement text
//!
//! Extracted PDF text wraps table rows across lines and pages at arbitrary
//! points. Every pattern in the parsers runs against the canonical form
//! produced here: one line, single ASCII spaces, no invisible characters.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Characters that carry no content but break keyword matches
const INVISIBLE: [char; 4] = ['\u{200b}', '\u{200c}', '\u{feff}', '\u{ad}'];

/// Collapse all whitespace runs (including newlines and NBSP) into one space
pub fn canonicalize(text: &str) -> String {
    let visible: String = text.chars().filter(|c| !INVISIBLE.contains(c)).collect();
    RE_WHITESPACE.replace_all(&visible, " ").trim().to_string()
}

/// Canonicalize pages and join them in page order
pub fn join_pages(pages: &[String]) -> String {
    pages
        .iter()
        .map(|page| canonicalize(page))
        .filter(|page| !page.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize_collapses_wraps() {
        assert_eq!(
            canonicalize("  DP Name :\r\n  ABC\tBROKING\u{a0}LTD \n\n"),
            "DP Name : ABC BROKING LTD"
        );
    }

    #[test]
    fn test_canonicalize_strips_invisible() {
        assert_eq!(canonicalize("DP\u{200b} ID"), "DP ID");
        assert_eq!(canonicalize("BO\u{feff} ID"), "BO ID");
    }

    #[test]
    fn test_join_pages_keeps_order() {
        let pages = vec![
            "page one\n".to_string(),
            "   ".to_string(),
            "page\ntwo".to_string(),
        ];
        assert_eq!(join_pages(&pages), "page one page two");
    }

    #[test]
    fn test_canonicalize_is_idempotent() {
        let once = canonicalize("a \n b\t\tc");
        assert_eq!(canonicalize(&once), once);
    }
}
