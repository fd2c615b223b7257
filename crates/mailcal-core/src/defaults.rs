//! Centralized default constants for mailcal.
//!
//! **This module is the single source of truth** for shared default values.
//! Configuration structs fall back to these when an environment variable is
//! unset.

// =============================================================================
// TIMEZONE
// =============================================================================

use chrono_tz::Tz;

/// Timezone used when none is configured.
pub const TIMEZONE: Tz = chrono_tz::Asia::Kolkata;

// =============================================================================
// SCORING
// =============================================================================

/// Points awarded when the intent classifier says "event".
pub const INTENT_POINTS: u8 = 2;

/// Points awarded when the temporal extractor resolves a start time.
pub const TEMPORAL_POINTS: u8 = 2;

/// Points awarded for an event keyword in the subject.
pub const SUBJECT_KEYWORD_POINTS: u8 = 1;

/// Points awarded for an event keyword in the body.
pub const BODY_KEYWORD_POINTS: u8 = 1;

/// Highest attainable confidence score.
pub const MAX_SCORE: u8 =
    INTENT_POINTS + TEMPORAL_POINTS + SUBJECT_KEYWORD_POINTS + BODY_KEYWORD_POINTS;

/// Minimum confidence score for acceptance.
pub const SCORE_THRESHOLD: u8 = 2;

/// Number of leading body characters scanned for event keywords.
pub const BODY_SCAN_CHARS: usize = 300;

/// Event-indicating keywords, matched case-insensitively as substrings.
pub const EVENT_KEYWORDS: &[&str] = &[
    "meeting",
    "interview",
    "call",
    "tutorial",
    "class",
    "session",
    "appointment",
    "scheduled",
    "schedule",
    "felicitation",
    "event",
    "conference",
    "webinar",
    "workshop",
    "seminar",
    "exam",
    "test",
    "deadline",
    "night",
    "party",
    "celebration",
    "ceremony",
    "prep",
    "training",
    "orientation",
    "hackathon",
    "competition",
];

// =============================================================================
// TEMPORAL EXTRACTION
// =============================================================================

/// Hour assigned to a date that carries no explicit time.
pub const DEFAULT_HOUR: u32 = 9;

/// Explicit years further than this from the reference year are replaced
/// with the reference year.
pub const YEAR_TOLERANCE: i32 = 1;

// =============================================================================
// EVENT BUILDING
// =============================================================================

/// Fixed event duration in minutes.
pub const EVENT_DURATION_MINUTES: i64 = 60;

/// Display-length limit for event titles, in characters.
pub const TITLE_MAX_CHARS: usize = 120;

/// Title used when the subject line is empty.
pub const UNTITLED_SUBJECT: &str = "No Subject";

// =============================================================================
// INFERENCE
// =============================================================================

/// Default Ollama endpoint.
pub const OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Default generation model for the event probe.
pub const CLASSIFIER_MODEL: &str = "flan-t5-small";

/// Upper bound on one classifier invocation.
pub const CLASSIFIER_TIMEOUT_SECS: u64 = 10;

/// Number of leading body characters included in the model probe.
pub const PROBE_BODY_CHARS: usize = 200;

/// Timeout for the backend health check at startup.
pub const HEALTH_CHECK_TIMEOUT_SECS: u64 = 5;

// =============================================================================
// WORKER
// =============================================================================

/// Maximum number of messages evaluated concurrently.
pub const WORKER_MAX_CONCURRENT: usize = 4;

/// Capacity of the inbound message queue.
pub const WORKER_QUEUE_CAPACITY: usize = 64;

/// Capacity of the worker event broadcast channel.
pub const EVENT_BUS_CAPACITY: usize = 256;
