//! Consolidated Account Statement (CAS) parser.
//!
//! Turns a depository CAS PDF into a typed [`ParsedStatement`]: investor
//! identity, demat accounts with classified holdings, mutual fund folios and
//! exact totals.

pub mod cas_import;
pub mod config;
pub mod error;
pub mod events;
pub mod models;

pub use cas_import::loader::{PdfTextExtractor, TextExtractor};
pub use cas_import::parser::{parse_async, CasInput, CasParser};
pub use config::ParserConfig;
pub use error::{CasError, CasErrorKind};
pub use events::{ParseProgressPayload, ParseStage, ProgressSink};
pub use models::{CasFormat, ParsedStatement, Summary};
