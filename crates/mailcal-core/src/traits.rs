//! Core traits for mailcal abstractions.
//!
//! These traits define the capabilities the pipeline consumes from its
//! collaborators (clock, model, calendar), enabling pluggable backends and
//! testability.

use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::*;

// =============================================================================
// CLOCK
// =============================================================================

/// Source of current wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to a settable instant, for tests and replays.
#[derive(Debug)]
pub struct FixedClock {
    now: RwLock<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(now),
        }
    }

    /// Move the clock to a new instant.
    pub fn set(&self, now: DateTime<Utc>) {
        match self.now.write() {
            Ok(mut guard) => *guard = now,
            Err(poisoned) => *poisoned.into_inner() = now,
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        match self.now.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

// =============================================================================
// INFERENCE TRAITS
// =============================================================================

/// Backend for text generation (LLM).
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Generate text given a prompt.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Check if the backend is available and responding.
    async fn health_check(&self) -> Result<bool>;

    /// Get the model name being used.
    fn model_name(&self) -> &str;
}

/// Decides whether a message plausibly describes a schedulable event.
///
/// Implementations never fail: an unusable answer is reported as "not an
/// event". The scorer sees only the [`ClassificationResult`].
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(&self, subject: &str, body: &str) -> ClassificationResult;

    /// Which implementation this is, for logging.
    fn mode(&self) -> ClassifierMode;
}

// =============================================================================
// CALENDAR
// =============================================================================

/// External calendar-write capability.
#[async_trait]
pub trait CalendarWriter: Send + Sync {
    /// Create the event and return the calendar's identifier for it.
    async fn create_event(&self, event: &EventDescriptor) -> Result<String>;
}
