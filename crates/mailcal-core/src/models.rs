//! Data model shared by every pipeline stage.

use std::fmt;
use std::ops::Range;

use chrono::{DateTime, FixedOffset, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// INBOUND MESSAGE
// =============================================================================

/// A message fetched from the inbox.
///
/// Immutable once fetched; the pipeline keeps only `id` after evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Identifier, unique per source.
    pub id: String,
    pub subject: String,
    pub body: String,
    pub received_at: DateTime<Utc>,
}

impl InboundMessage {
    pub fn new(
        id: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
        received_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            subject: subject.into(),
            body: body.into(),
            received_at,
        }
    }

    /// Subject and body joined by a newline, the text the extractor scans.
    pub fn combined_text(&self) -> String {
        format!("{}\n{}", self.subject, self.body)
    }
}

// =============================================================================
// TEMPORAL CANDIDATE
// =============================================================================

/// Pattern families tried by the temporal extractor, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternFamily {
    /// Explicit calendar date plus explicit time.
    DateWithTime,
    /// "today" / "tomorrow" plus explicit time.
    RelativeDayWithTime,
    /// Calendar date (or bare relative day) with the default hour.
    DateOnly,
    /// Explicit time on the reference date.
    TimeOnly,
}

impl PatternFamily {
    /// All families in scan order.
    pub const ORDERED: [PatternFamily; 4] = [
        PatternFamily::DateWithTime,
        PatternFamily::RelativeDayWithTime,
        PatternFamily::DateOnly,
        PatternFamily::TimeOnly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PatternFamily::DateWithTime => "date_with_time",
            PatternFamily::RelativeDayWithTime => "relative_day_with_time",
            PatternFamily::DateOnly => "date_only",
            PatternFamily::TimeOnly => "time_only",
        }
    }
}

impl fmt::Display for PatternFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A parsed, not-yet-validated date/time found in message text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporalCandidate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    /// Date came from a relative keyword such as "tomorrow".
    pub is_relative: bool,
    /// Byte range of the matched date (or time) expression in the scanned text.
    pub source_span: Range<usize>,
}

impl TemporalCandidate {
    /// Wall-clock date and time, or `None` for impossible values (Feb 30, 25:00).
    pub fn naive(&self) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)?.and_hms_opt(
            self.hour,
            self.minute,
            0,
        )
    }

    /// Resolve to an absolute instant in `tz`.
    ///
    /// Local times skipped by a DST transition do not exist and yield `None`;
    /// ambiguous local times resolve to the earlier instant.
    pub fn resolve<T: TimeZone>(&self, tz: &T) -> Option<DateTime<T>> {
        let naive = self.naive()?;
        match tz.from_local_datetime(&naive) {
            LocalResult::Single(dt) => Some(dt),
            LocalResult::Ambiguous(earliest, _) => Some(earliest),
            LocalResult::None => None,
        }
    }
}

// =============================================================================
// CLASSIFICATION
// =============================================================================

/// Which intent classifier implementation is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierMode {
    Model,
    Keyword,
}

impl ClassifierMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassifierMode::Model => "model",
            ClassifierMode::Keyword => "keyword",
        }
    }
}

impl fmt::Display for ClassifierMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Intent classifier verdict for one message.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub is_event: bool,
    /// Numeric confidence when the model provides one; always `None` in keyword mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_score: Option<f32>,
}

impl ClassificationResult {
    pub fn event(raw_score: Option<f32>) -> Self {
        Self {
            is_event: true,
            raw_score,
        }
    }

    pub fn not_event(raw_score: Option<f32>) -> Self {
        Self {
            is_event: false,
            raw_score,
        }
    }

    /// Verdict synthesized from keyword presence, without a numeric score.
    pub fn from_keywords(hit: bool) -> Self {
        Self {
            is_event: hit,
            raw_score: None,
        }
    }
}

// =============================================================================
// CONFIDENCE SCORE
// =============================================================================

/// Which of the four signals fired.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub intent: bool,
    pub temporal: bool,
    pub subject_keyword: bool,
    pub body_keyword: bool,
}

/// Integer evidence score (0-6) and the verdict against the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfidenceScore {
    pub total: u8,
    pub threshold: u8,
    pub breakdown: ScoreBreakdown,
}

impl ConfidenceScore {
    pub fn is_accepted(&self) -> bool {
        self.total >= self.threshold
    }
}

impl fmt::Display for ConfidenceScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.total, crate::defaults::MAX_SCORE)
    }
}

// =============================================================================
// EVENT DESCRIPTOR
// =============================================================================

/// A calendar entry ready to be written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDescriptor {
    /// Message the event was detected in.
    pub message_id: String,
    pub title: String,
    pub start: DateTime<FixedOffset>,
    /// Always `start` plus the fixed event duration.
    pub end: DateTime<FixedOffset>,
    /// IANA timezone name.
    pub timezone: String,
    pub description: String,
}

/// Why a message produced no event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Confidence score below threshold.
    LowConfidence,
    /// No temporal candidate resolved to a concrete instant.
    NoDate,
    /// Start time lies before the evaluation time.
    PastEvent,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::LowConfidence => "low_confidence",
            RejectReason::NoDate => "no_date",
            RejectReason::PastEvent => "past_event",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
