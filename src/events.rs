//! Progress events for long-running statement parses.
//!
//! The parser emits one payload after each stage completes so a UI can drive a
//! progress bar. Events are advisory and never affect the parse result.

use serde::{Deserialize, Serialize};

/// Event name constant
pub const PARSE_PROGRESS_EVENT: &str = "cas_parse_progress";

/// Pipeline stage of a single parse call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseStage {
    Idle,
    TextExtracting,
    FormatDetecting,
    Dispatching,
    SectionParsing,
    Aggregating,
    Done,
}

impl ParseStage {
    /// Percentage reported once this stage has completed
    pub fn percent(&self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::TextExtracting => 40,
            Self::FormatDetecting => 50,
            Self::Dispatching => 55,
            Self::SectionParsing => 85,
            Self::Aggregating => 95,
            Self::Done => 100,
        }
    }
}

/// Payload for progress events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseProgressPayload {
    pub tracking_id: String,
    pub stage: ParseStage,
    pub percent: u8,
    pub message: String,
}

impl ParseProgressPayload {
    pub fn completed(tracking_id: &str, stage: ParseStage, message: impl Into<String>) -> Self {
        Self {
            tracking_id: tracking_id.to_string(),
            stage,
            percent: stage.percent(),
            message: message.into(),
        }
    }
}

/// Receiver of progress payloads
pub trait ProgressSink {
    fn emit(&self, payload: &ParseProgressPayload);
}

impl<F> ProgressSink for F
where
    F: Fn(&ParseProgressPayload),
{
    fn emit(&self, payload: &ParseProgressPayload) {
        self(payload)
    }
}

/// Sink that only logs
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn emit(&self, payload: &ParseProgressPayload) {
        log::debug!(
            "[{}] {} {:?} {}%: {}",
            payload.tracking_id,
            PARSE_PROGRESS_EVENT,
            payload.stage,
            payload.percent,
            payload.message
        );
    }
}
