//! Fatal parse errors.

use serde::Serialize;
use thiserror::Error;

use crate::models::CasFormat;

/// Discriminator for [`CasError`], suitable for sending to a UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CasErrorKind {
    /// Password missing or rejected - user can retry with another password
    WrongPassword,
    /// Corrupt or unsupported PDF
    UnreadableDocument,
    /// Too little text, most likely a scanned statement
    InsufficientText,
    /// No known CAS layout matched
    UnrecognizedFormat,
    /// Layout matched but nothing could be extracted
    FormatParseFailure,
}

impl CasErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WrongPassword => "WRONG_PASSWORD",
            Self::UnreadableDocument => "UNREADABLE_DOCUMENT",
            Self::InsufficientText => "INSUFFICIENT_TEXT",
            Self::UnrecognizedFormat => "UNRECOGNIZED_FORMAT",
            Self::FormatParseFailure => "FORMAT_PARSE_FAILURE",
        }
    }
}

#[derive(Debug, Error)]
pub enum CasError {
    #[error("PDF is encrypted and the password is missing or incorrect")]
    WrongPassword,

    #[error("Failed to read PDF: {0}")]
    UnreadableDocument(String),

    #[error("Extracted text too short ({length} chars, minimum {minimum})")]
    InsufficientText { length: usize, minimum: usize },

    #[error("Document does not match any supported CAS format")]
    UnrecognizedFormat,

    #[error("{format} statement contained no demat accounts and no mutual fund folios")]
    FormatParseFailure { format: CasFormat },
}

impl CasError {
    pub fn kind(&self) -> CasErrorKind {
        match self {
            Self::WrongPassword => CasErrorKind::WrongPassword,
            Self::UnreadableDocument(_) => CasErrorKind::UnreadableDocument,
            Self::InsufficientText { .. } => CasErrorKind::InsufficientText,
            Self::UnrecognizedFormat => CasErrorKind::UnrecognizedFormat,
            Self::FormatParseFailure { .. } => CasErrorKind::FormatParseFailure,
        }
    }

    /// Message telling the user what to do next
    pub fn user_message(&self) -> &'static str {
        match self.kind() {
            CasErrorKind::WrongPassword => {
                "The statement is password protected. Please re-enter the password (usually your PAN in capitals)."
            }
            CasErrorKind::UnreadableDocument => {
                "The file could not be read as a PDF. Please download the statement again and retry."
            }
            CasErrorKind::InsufficientText => {
                "No readable text was found. Scanned statements are not supported; please upload the original PDF."
            }
            CasErrorKind::UnrecognizedFormat => {
                "This does not look like a CDSL Consolidated Account Statement."
            }
            CasErrorKind::FormatParseFailure => {
                "The statement was recognized but no accounts or folios could be read from it."
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, CasError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(CasError::WrongPassword.kind(), CasErrorKind::WrongPassword);
        assert_eq!(
            CasError::InsufficientText { length: 3, minimum: 100 }.kind(),
            CasErrorKind::InsufficientText
        );
        assert_eq!(
            CasError::FormatParseFailure { format: CasFormat::Cdsl }.kind(),
            CasErrorKind::FormatParseFailure
        );
    }

    #[test]
    fn test_display() {
        let err = CasError::FormatParseFailure { format: CasFormat::Cdsl };
        assert_eq!(
            err.to_string(),
            "CDSL statement contained no demat accounts and no mutual fund folios"
        );
        assert!(CasError::WrongPassword.user_message().contains("password"));
    }
}
