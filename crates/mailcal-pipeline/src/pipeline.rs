//! Per-message evaluation.
//!
//! One call to [`EventPipeline::evaluate`] takes a message through the
//! ledger claim, temporal extraction, intent classification, scoring, and
//! event building, then records it as processed. Nothing here fails: every
//! problem ends as a rejection.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, instrument};

use mailcal_core::{
    ClassifierMode, Clock, ConfidenceScore, ConfidenceScorer, DedupLedger, EventBuilder,
    EventDescriptor, InboundMessage, IntentClassifier, PatternFamily, PipelineConfig,
    RejectReason, SystemClock, TemporalExtractor,
};

/// What became of a message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum Outcome {
    /// An event should be written.
    Accepted(EventDescriptor),
    /// Evaluated, no event.
    Rejected(RejectReason),
    /// Already claimed or processed; nothing was evaluated.
    Duplicate,
}

impl Outcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Outcome::Accepted(_))
    }

    pub fn event(&self) -> Option<&EventDescriptor> {
        match self {
            Outcome::Accepted(event) => Some(event),
            _ => None,
        }
    }

    pub fn reject_reason(&self) -> Option<RejectReason> {
        match self {
            Outcome::Rejected(reason) => Some(*reason),
            _ => None,
        }
    }
}

/// Result of evaluating one message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub message_id: String,
    /// Absent for duplicates.
    pub score: Option<ConfidenceScore>,
    /// Pattern family that produced the start time, if any.
    pub family: Option<PatternFamily>,
    pub outcome: Outcome,
}

impl Evaluation {
    fn duplicate(message_id: &str) -> Self {
        Self {
            message_id: message_id.to_string(),
            score: None,
            family: None,
            outcome: Outcome::Duplicate,
        }
    }
}

/// The detection stages wired together around a shared ledger.
pub struct EventPipeline {
    extractor: TemporalExtractor,
    scorer: ConfidenceScorer,
    builder: EventBuilder,
    classifier: Arc<dyn IntentClassifier>,
    clock: Arc<dyn Clock>,
    ledger: Arc<DedupLedger>,
}

impl EventPipeline {
    /// Create a pipeline on the system clock with a fresh ledger.
    pub fn new(config: &PipelineConfig, classifier: Arc<dyn IntentClassifier>) -> Self {
        Self {
            extractor: TemporalExtractor::new(config.timezone, config.default_hour),
            scorer: ConfidenceScorer::new(
                config.keywords.clone(),
                config.score_threshold,
                config.body_scan_chars,
            ),
            builder: EventBuilder::new(config.timezone, config.title_max_chars),
            classifier,
            clock: Arc::new(SystemClock),
            ledger: Arc::new(DedupLedger::new()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Share a ledger with other pipelines.
    pub fn with_ledger(mut self, ledger: Arc<DedupLedger>) -> Self {
        self.ledger = ledger;
        self
    }

    pub fn ledger(&self) -> &Arc<DedupLedger> {
        &self.ledger
    }

    pub fn classifier_mode(&self) -> ClassifierMode {
        self.classifier.mode()
    }

    /// Evaluate a message at most once.
    ///
    /// The ledger claim happens before any stage runs, so a repeated
    /// notification never reaches the classifier. The message is marked
    /// processed whether or not an event results.
    #[instrument(skip(self, message), fields(subsystem = "pipeline", component = "pipeline", op = "evaluate", message_id = %message.id))]
    pub async fn evaluate(&self, message: &InboundMessage) -> Evaluation {
        if !self.ledger.try_begin(&message.id) {
            debug!("Duplicate notification, skipping");
            return Evaluation::duplicate(&message.id);
        }

        let start = Instant::now();
        let now = self.clock.now();

        let temporal = self.extractor.extract(&message.combined_text(), now);
        let classification = self
            .classifier
            .classify(&message.subject, &message.body)
            .await;
        let score = self.scorer.score(
            &classification,
            temporal.is_some(),
            &message.subject,
            &message.body,
        );

        let outcome = match self.builder.build(
            &message.id,
            &score,
            temporal.as_ref(),
            &message.subject,
            now,
        ) {
            Ok(event) => Outcome::Accepted(event),
            Err(reason) => Outcome::Rejected(reason),
        };

        self.ledger.mark_processed(&message.id);

        let duration_ms = start.elapsed().as_millis() as u64;
        match &outcome {
            Outcome::Accepted(event) => info!(
                score = score.total,
                classifier_mode = %self.classifier.mode(),
                start = %event.start.to_rfc3339(),
                duration_ms,
                "Event detected"
            ),
            Outcome::Rejected(reason) => debug!(
                score = score.total,
                classifier_mode = %self.classifier.mode(),
                reason = %reason,
                duration_ms,
                "No event"
            ),
            Outcome::Duplicate => {}
        }

        Evaluation {
            message_id: message.id.clone(),
            score: Some(score),
            family: temporal.map(|t| t.family),
            outcome,
        }
    }
}
