//! Event building: turn an accepted detection into a calendar entry.

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use tracing::debug;

use crate::defaults;
use crate::models::{ConfidenceScore, EventDescriptor, RejectReason};
use crate::temporal::ResolvedTemporal;

/// Builds [`EventDescriptor`]s and enforces the score, date, and past-event gates.
#[derive(Debug, Clone)]
pub struct EventBuilder {
    tz: Tz,
    title_max_chars: usize,
}

impl EventBuilder {
    pub fn new(tz: Tz, title_max_chars: usize) -> Self {
        Self {
            tz,
            title_max_chars: title_max_chars.max(1),
        }
    }

    /// Build the event for `message_id`, or say why not.
    ///
    /// Gates, in order: the score must be accepted, a start time must exist,
    /// and the start must not be earlier than `now` (equal is allowed).
    pub fn build(
        &self,
        message_id: &str,
        score: &ConfidenceScore,
        temporal: Option<&ResolvedTemporal>,
        subject: &str,
        now: DateTime<Utc>,
    ) -> std::result::Result<EventDescriptor, RejectReason> {
        if !score.is_accepted() {
            debug!(message_id, score = score.total, "Score below threshold");
            return Err(RejectReason::LowConfidence);
        }

        let Some(temporal) = temporal else {
            debug!(message_id, score = score.total, "Accepted score but no date");
            return Err(RejectReason::NoDate);
        };

        let start = temporal.start.with_timezone(&self.tz);
        if start < now.with_timezone(&self.tz) {
            debug!(
                message_id,
                start = %start.to_rfc3339(),
                "Event start is in the past"
            );
            return Err(RejectReason::PastEvent);
        }

        let end = start + Duration::minutes(defaults::EVENT_DURATION_MINUTES);
        Ok(EventDescriptor {
            message_id: message_id.to_string(),
            title: self.title(subject),
            start: start.fixed_offset(),
            end: end.fixed_offset(),
            timezone: self.tz.name().to_string(),
            description: format!("Confidence: {}", score),
        })
    }

    /// Subject verbatim, truncated to the display limit.
    pub fn title(&self, subject: &str) -> String {
        let trimmed = subject.trim();
        if trimmed.is_empty() {
            return defaults::UNTITLED_SUBJECT.to_string();
        }
        if trimmed.chars().count() <= self.title_max_chars {
            return trimmed.to_string();
        }
        let keep = self.title_max_chars.saturating_sub(1);
        let mut title: String = trimmed.chars().take(keep).collect();
        title.truncate(title.trim_end().len());
        title.push('…');
        title
    }
}

impl Default for EventBuilder {
    fn default() -> Self {
        Self::new(defaults::TIMEZONE, defaults::TITLE_MAX_CHARS)
    }
}
