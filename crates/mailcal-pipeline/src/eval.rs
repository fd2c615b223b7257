//! Detection quality evaluation.
//!
//! Runs labelled messages through an [`EventPipeline`] and reports how
//! often the pipeline agrees with the label.
//!
//! # Metrics
//!
//! - **Precision**: detected events that were real events
//! - **Recall**: real events that were detected
//! - **Start accuracy**: for true positives with an expected start, whether
//!   the detected start matches to the minute

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::Instant;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use mailcal_core::{InboundMessage, Result};

use crate::pipeline::{EventPipeline, Outcome};

/// Labelled message for detection evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionCase {
    /// Case identifier, also used as the message id.
    pub id: String,
    pub subject: String,
    pub body: String,
    /// Whether an event should be created.
    pub expect_event: bool,
    /// Expected local start, `YYYY-MM-DDTHH:MM`.
    #[serde(default)]
    pub expected_start: Option<String>,
}

impl DetectionCase {
    pub fn new(
        id: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
        expect_event: bool,
    ) -> Self {
        Self {
            id: id.into(),
            subject: subject.into(),
            body: body.into(),
            expect_event,
            expected_start: None,
        }
    }

    pub fn with_expected_start(mut self, start: impl Into<String>) -> Self {
        self.expected_start = Some(start.into());
        self
    }

    fn to_message(&self, received_at: DateTime<Utc>) -> InboundMessage {
        InboundMessage::new(&self.id, &self.subject, &self.body, received_at)
    }
}

/// Evaluation result for a single case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseResult {
    pub case_id: String,
    pub expected: bool,
    pub detected: bool,
    /// Score, absent if the case was skipped as a duplicate.
    pub score: Option<u8>,
    /// Rejection reason or `accepted`/`duplicate`.
    pub outcome: String,
    /// Detected local start, `YYYY-MM-DDTHH:MM`.
    pub start: Option<String>,
    /// Whether the detected start matched the expectation, when one exists.
    pub start_matches: Option<bool>,
    pub latency_ms: u64,
}

impl CaseResult {
    pub fn passed(&self) -> bool {
        self.expected == self.detected && self.start_matches.unwrap_or(true)
    }
}

/// Summary of a detection run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionReport {
    pub suite: String,
    /// Model name, or `keyword` for the keyword classifier.
    pub classifier: String,
    pub total: usize,
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    pub true_negatives: usize,
    /// Precision (0.0 - 1.0); 1.0 when nothing was detected.
    pub precision: f32,
    /// Recall (0.0 - 1.0); 1.0 when nothing was expected.
    pub recall: f32,
    /// True positives whose start was checked and matched.
    pub start_matches: usize,
    /// True positives whose start was checked.
    pub start_checked: usize,
    pub latency_p50_ms: u64,
    pub results: Vec<CaseResult>,
}

impl DetectionReport {
    /// Create from a list of results.
    pub fn from_results(
        suite: impl Into<String>,
        classifier: impl Into<String>,
        results: Vec<CaseResult>,
    ) -> Self {
        let count = |expected: bool, detected: bool| {
            results
                .iter()
                .filter(|r| r.expected == expected && r.detected == detected)
                .count()
        };
        let true_positives = count(true, true);
        let false_positives = count(false, true);
        let false_negatives = count(true, false);
        let true_negatives = count(false, false);

        let ratio = |num: usize, den: usize| {
            if den == 0 {
                1.0
            } else {
                num as f32 / den as f32
            }
        };

        let start_checked = results
            .iter()
            .filter(|r| r.start_matches.is_some())
            .count();
        let start_matches = results
            .iter()
            .filter(|r| r.start_matches == Some(true))
            .count();

        let mut latencies: Vec<u64> = results.iter().map(|r| r.latency_ms).collect();
        latencies.sort_unstable();
        let latency_p50 = latencies.get(latencies.len() / 2).copied().unwrap_or(0);

        Self {
            suite: suite.into(),
            classifier: classifier.into(),
            total: results.len(),
            true_positives,
            false_positives,
            false_negatives,
            true_negatives,
            precision: ratio(true_positives, true_positives + false_positives),
            recall: ratio(true_positives, true_positives + false_negatives),
            start_matches,
            start_checked,
            latency_p50_ms: latency_p50,
            results,
        }
    }

    /// Cases whose detection or start disagreed with the label.
    pub fn failures(&self) -> impl Iterator<Item = &CaseResult> {
        self.results.iter().filter(|r| !r.passed())
    }

    pub fn passed(&self) -> usize {
        self.results.iter().filter(|r| r.passed()).count()
    }
}

/// Run `cases` through `pipeline` and summarise.
///
/// Case ids double as message ids, so repeated ids after the first are
/// reported as duplicates.
pub async fn run_suite(
    suite: &str,
    classifier: &str,
    pipeline: &EventPipeline,
    cases: &[DetectionCase],
    received_at: DateTime<Utc>,
) -> DetectionReport {
    let mut results = Vec::with_capacity(cases.len());

    for case in cases {
        let start = Instant::now();
        let evaluation = pipeline.evaluate(&case.to_message(received_at)).await;
        let latency_ms = start.elapsed().as_millis() as u64;

        let (detected, outcome, local_start) = match &evaluation.outcome {
            Outcome::Accepted(event) => (
                true,
                "accepted".to_string(),
                Some(event.start.format("%Y-%m-%dT%H:%M").to_string()),
            ),
            Outcome::Rejected(reason) => (false, reason.to_string(), None),
            Outcome::Duplicate => (false, "duplicate".to_string(), None),
        };

        let start_matches = match (&case.expected_start, &local_start) {
            (Some(expected), Some(actual)) if case.expect_event => Some(expected == actual),
            _ => None,
        };

        results.push(CaseResult {
            case_id: case.id.clone(),
            expected: case.expect_event,
            detected,
            score: evaluation.score.map(|s| s.total),
            outcome,
            start: local_start,
            start_matches,
            latency_ms,
        });
    }

    DetectionReport::from_results(suite, classifier, results)
}

/// Reference instant for [`smoke_suite`]: 2025-06-01 00:00 UTC.
pub fn smoke_reference_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

/// Built-in cases modelled on typical inbox mail, labelled for evaluation
/// at [`smoke_reference_time`] in `Asia/Kolkata`.
pub fn smoke_suite() -> Vec<DetectionCase> {
    vec![
        DetectionCase::new(
            "interview-invite",
            "Interview Invitation",
            "Your interview is scheduled on December 15, 2025 at 2:30 PM.",
            true,
        )
        .with_expected_start("2025-12-15T14:30"),
        DetectionCase::new(
            "project-meeting",
            "Project meeting",
            "Let's schedule the kickoff for 20th June 2025 at 11am in room 4.",
            true,
        )
        .with_expected_start("2025-06-20T11:00"),
        DetectionCase::new(
            "iso-workshop",
            "Workshop registration confirmed",
            "The workshop takes place on 2025-09-03 at 10:00.",
            true,
        )
        .with_expected_start("2025-09-03T10:00"),
        DetectionCase::new(
            "date-only-exam",
            "Mid-term exam",
            "The exam will be held on 3rd of July.",
            true,
        )
        .with_expected_start("2025-07-03T09:00"),
        DetectionCase::new(
            "tomorrow-call",
            "Quick call",
            "Can we do a call tomorrow at 3pm?",
            true,
        )
        .with_expected_start("2025-06-02T15:00"),
        DetectionCase::new(
            "newsletter",
            "Your weekly digest",
            "Here are the top stories from around the web this week.",
            false,
        ),
        DetectionCase::new(
            "receipt",
            "Your order has shipped",
            "Order #4821 is on its way and should arrive soon.",
            false,
        ),
        DetectionCase::new(
            "team-sync",
            "Team Sync",
            "Thanks everyone, notes are in the shared folder.",
            false,
        ),
        DetectionCase::new(
            "past-seminar",
            "Seminar recording",
            "Thanks for attending the seminar on 10 January 2025 at 4pm.",
            false,
        ),
    ]
}

/// Load detection cases from a JSONL file, one case per line.
pub fn load_cases(path: impl AsRef<Path>) -> Result<Vec<DetectionCase>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut cases = Vec::new();

    for line in reader.lines() {
        let line = line?;
        if !line.trim().is_empty() {
            cases.push(serde_json::from_str(&line)?);
        }
    }

    Ok(cases)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use mailcal_core::{FixedClock, PipelineConfig};
    use mailcal_inference::KeywordClassifier;

    fn result(expected: bool, detected: bool) -> CaseResult {
        CaseResult {
            case_id: "c".into(),
            expected,
            detected,
            score: Some(0),
            outcome: String::new(),
            start: None,
            start_matches: None,
            latency_ms: 0,
        }
    }

    #[test]
    fn test_report_confusion_counts() {
        let report = DetectionReport::from_results(
            "unit",
            "keyword",
            vec![
                result(true, true),
                result(true, true),
                result(false, true),
                result(true, false),
                result(false, false),
            ],
        );
        assert_eq!(report.true_positives, 2);
        assert_eq!(report.false_positives, 1);
        assert_eq!(report.false_negatives, 1);
        assert_eq!(report.true_negatives, 1);
        assert!((report.precision - 2.0 / 3.0).abs() < 1e-6);
        assert!((report.recall - 2.0 / 3.0).abs() < 1e-6);
        assert_eq!(report.passed(), 3);
        assert_eq!(report.failures().count(), 2);
    }

    #[test]
    fn test_report_empty() {
        let report = DetectionReport::from_results("unit", "keyword", vec![]);
        assert_eq!(report.total, 0);
        assert_eq!(report.precision, 1.0);
        assert_eq!(report.recall, 1.0);
        assert_eq!(report.latency_p50_ms, 0);
    }

    #[test]
    fn test_case_result_start_mismatch_fails() {
        let mut r = result(true, true);
        r.start_matches = Some(false);
        assert!(!r.passed());
    }

    #[test]
    fn test_case_jsonl_shape() {
        let json = r#"{"id":"a","subject":"s","body":"b","expect_event":true}"#;
        let case: DetectionCase = serde_json::from_str(json).unwrap();
        assert!(case.expect_event);
        assert!(case.expected_start.is_none());
    }

    #[test]
    fn test_smoke_suite_ids_unique() {
        let suite = smoke_suite();
        let mut ids: Vec<_> = suite.iter().map(|c| c.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), suite.len());
    }

    #[tokio::test]
    async fn test_smoke_suite_with_keyword_classifier() {
        let clock = Arc::new(FixedClock::new(smoke_reference_time()));
        let pipeline = EventPipeline::new(
            &PipelineConfig::default(),
            Arc::new(KeywordClassifier::default()),
        )
        .with_clock(clock);

        let report = run_suite(
            "smoke",
            "keyword",
            &pipeline,
            &smoke_suite(),
            smoke_reference_time(),
        )
        .await;

        assert_eq!(report.total, smoke_suite().len());
        assert_eq!(report.false_positives, 0, "{:?}", report.failures().collect::<Vec<_>>());
        assert_eq!(report.false_negatives, 0, "{:?}", report.failures().collect::<Vec<_>>());
        assert_eq!(report.start_matches, report.start_checked);
    }

    #[tokio::test]
    async fn test_repeated_case_id_is_duplicate() {
        let pipeline = EventPipeline::new(
            &PipelineConfig::default(),
            Arc::new(KeywordClassifier::default()),
        )
        .with_clock(Arc::new(FixedClock::new(smoke_reference_time())));
        let case = DetectionCase::new("same", "meeting", "tomorrow at 3pm", true);

        let report = run_suite(
            "dup",
            "keyword",
            &pipeline,
            &[case.clone(), case],
            smoke_reference_time(),
        )
        .await;
        assert_eq!(report.results[1].outcome, "duplicate");
        assert_eq!(report.false_negatives, 1);
    }
}
