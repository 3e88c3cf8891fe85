//! PDF text extraction boundary.
//!
//! Text is pulled page by page with lopdf, which also handles password
//! protected statements. pdf-extract is kept as a fallback for unencrypted
//! files where lopdf finds no text.
//!
//! Only a password check that fails is reported as a wrong password. lopdf
//! decrypts the RC4 schemes (V 1-2, R 2-3); AES encrypted files are
//! reported as unreadable.

use std::panic;

use lopdf::encryption::DecryptionError;
use lopdf::Document;

use crate::error::{CasError, Result};

/// PDF magic bytes
const PDF_MAGIC: &[u8] = b"%PDF";

/// Source of per-page statement text
pub trait TextExtractor: Send + Sync {
    /// Text of every page, in page order
    fn extract_pages(&self, bytes: &[u8], password: Option<&str>) -> Result<Vec<String>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTextExtractor;

impl PdfTextExtractor {
    pub fn new() -> Self {
        Self
    }
}

pub fn validate_pdf(bytes: &[u8]) -> Result<()> {
    if bytes.len() < 8 {
        return Err(CasError::UnreadableDocument(
            "File too small to be a valid PDF".to_string(),
        ));
    }

    if !bytes.starts_with(PDF_MAGIC) {
        return Err(CasError::UnreadableDocument(
            "Invalid PDF file: missing PDF header".to_string(),
        ));
    }

    Ok(())
}

fn decryption_error(error: lopdf::Error) -> CasError {
    match error {
        lopdf::Error::Decryption(DecryptionError::IncorrectPassword) => CasError::WrongPassword,
        other => CasError::UnreadableDocument(format!("Cannot decrypt PDF: {}", other)),
    }
}

impl TextExtractor for PdfTextExtractor {
    fn extract_pages(&self, bytes: &[u8], password: Option<&str>) -> Result<Vec<String>> {
        validate_pdf(bytes)?;

        let mut doc = Document::load_mem(bytes)
            .map_err(|e| CasError::UnreadableDocument(format!("Failed to load PDF: {}", e)))?;

        let encrypted = doc.is_encrypted();
        if encrypted {
            let Some(password) = password else {
                log::warn!("PDF is encrypted and no password was supplied");
                return Err(CasError::WrongPassword);
            };
            doc.decrypt(password).map_err(|e| {
                log::warn!("PDF decryption failed: {}", e);
                decryption_error(e)
            })?;
        }

        let pages: Vec<String> = doc
            .get_pages()
            .into_keys()
            .map(|page_num| {
                doc.extract_text(&[page_num]).unwrap_or_else(|e| {
                    log::debug!("Failed to extract text from page {}: {}", page_num, e);
                    String::new()
                })
            })
            .collect();

        let has_text = pages.iter().any(|page| !page.trim().is_empty());
        if has_text || encrypted {
            return Ok(pages);
        }

        log::info!(
            "lopdf found no text in {} pages, falling back to pdf-extract",
            pages.len()
        );
        extract_with_pdf_extract(bytes).map(|text| vec![text])
    }
}

/// pdf-extract can panic on malformed input; contain it here.
fn extract_with_pdf_extract(bytes: &[u8]) -> Result<String> {
    match panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes)) {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(CasError::UnreadableDocument(format!(
            "Failed to extract text from PDF: {}",
            e
        ))),
        Err(_) => Err(CasError::UnreadableDocument(
            "PDF text extraction crashed on malformed input".to_string(),
        )),
    }
}
