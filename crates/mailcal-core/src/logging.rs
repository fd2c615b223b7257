//! Structured logging field name constants for mailcal.
//!
//! All crates use these constants for consistent structured logging fields
//! so log aggregation can query one message's path through the pipeline.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Calendar write failed, worker task panicked |
//! | WARN  | Recoverable issue, automatic fallback applied (logged once) |
//! | INFO  | Lifecycle events (startup, shutdown), event creation |
//! | DEBUG | Decision points: score, matched pattern family, verdict |
//! | TRACE | Per-pattern iteration inside the extractor |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "core", "inference", "pipeline"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "temporal", "scorer", "builder", "ledger", "ollama", "worker"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "extract", "classify", "evaluate", "create_event"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Inbound message identifier.
pub const MESSAGE_ID: &str = "message_id";

/// Calendar event identifier returned by the writer.
pub const EVENT_ID: &str = "event_id";

// ─── Decision fields ───────────────────────────────────────────────────────

/// Confidence score (0-6).
pub const SCORE: &str = "score";

/// Temporal pattern family that produced the start time.
pub const FAMILY: &str = "family";

/// Active classifier implementation ("model" or "keyword").
pub const CLASSIFIER_MODE: &str = "classifier_mode";

/// Rejection reason when no event is produced.
pub const REASON: &str = "reason";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Byte length of a prompt.
pub const PROMPT_LEN: &str = "prompt_len";

/// Byte length of a model response.
pub const RESPONSE_LEN: &str = "response_len";

// ─── Inference fields ──────────────────────────────────────────────────────

/// Model name used for inference.
pub const MODEL: &str = "model";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

/// Slow operation threshold exceeded.
pub const SLOW: &str = "slow";
