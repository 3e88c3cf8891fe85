//! Parser configuration.
//!
//! Defaults, optionally overlaid by a JSON file and then by environment
//! variables (`CAS_PARSER_MIN_TEXT_LENGTH`, `CAS_PARSER_MAX_FILE_SIZE`,
//! `CAS_PARSER_KEEP_RAW_TEXT`).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

/// Minimum canonical text length before a document counts as scanned
pub const DEFAULT_MIN_TEXT_LENGTH: usize = 100;
/// Upload limit enforced by callers (10 MB)
pub const DEFAULT_MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    pub min_text_length: usize,
    pub max_file_size: usize,
    /// Attach the canonical statement text to `meta.raw_text`
    pub keep_raw_text: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            min_text_length: DEFAULT_MIN_TEXT_LENGTH,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            keep_raw_text: false,
        }
    }
}

impl ParserConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Invalid parser configuration")
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_json_str(&json)
    }

    /// Apply `CAS_PARSER_*` environment overrides.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|key| env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(v) = lookup("CAS_PARSER_MIN_TEXT_LENGTH") {
            self.min_text_length = v
                .trim()
                .parse()
                .with_context(|| format!("CAS_PARSER_MIN_TEXT_LENGTH is not a number: {}", v))?;
        }
        if let Some(v) = lookup("CAS_PARSER_MAX_FILE_SIZE") {
            self.max_file_size = v
                .trim()
                .parse()
                .with_context(|| format!("CAS_PARSER_MAX_FILE_SIZE is not a number: {}", v))?;
        }
        if let Some(v) = lookup("CAS_PARSER_KEEP_RAW_TEXT") {
            self.keep_raw_text = matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes");
        }
        Ok(self)
    }
}
