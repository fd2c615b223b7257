//! End-to-end detection properties of the evaluation pipeline.
//!
//! Each test drives `EventPipeline::evaluate` with a pinned clock and a
//! scripted model so that every signal is controlled.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use futures::future::join_all;

use mailcal_core::{FixedClock, InboundMessage, PipelineConfig, RejectReason};
use mailcal_inference::mock::MockGenerationBackend;
use mailcal_inference::{KeywordClassifier, ModelClassifier};
use mailcal_pipeline::{EventPipeline, Outcome};

fn reference() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()
}

fn message(id: &str, subject: &str, body: &str) -> InboundMessage {
    InboundMessage::new(id, subject, body, reference())
}

/// Pipeline whose model answers `answer` to every probe.
fn pipeline_answering(
    answer: &str,
    config: PipelineConfig,
) -> (EventPipeline, MockGenerationBackend) {
    let backend = MockGenerationBackend::new().with_fixed_response(answer);
    let pipeline = EventPipeline::new(&config, Arc::new(ModelClassifier::new(backend.clone())))
        .with_clock(Arc::new(FixedClock::new(reference())));
    (pipeline, backend)
}

#[tokio::test]
async fn test_no_date_never_produces_event() {
    let (pipeline, _) = pipeline_answering("YES", PipelineConfig::default());
    let eval = pipeline
        .evaluate(&message(
            "m1",
            "Meeting to schedule",
            "We should schedule a meeting sometime soon.",
        ))
        .await;

    // Intent, subject and body all fire, yet there is no start time.
    assert_eq!(eval.score.unwrap().total, 4);
    assert_eq!(eval.outcome, Outcome::Rejected(RejectReason::NoDate));
}

#[tokio::test]
async fn test_score_below_threshold_blocks_dated_message() {
    let config = PipelineConfig::default().with_score_threshold(3);
    let (pipeline, _) = pipeline_answering("NO", config);
    let eval = pipeline
        .evaluate(&message("m1", "Hello", "See you on 15 Dec 2025 at 2:30pm."))
        .await;

    assert_eq!(eval.score.unwrap().total, 2);
    assert!(eval.family.is_some());
    assert_eq!(eval.outcome, Outcome::Rejected(RejectReason::LowConfidence));
}

#[tokio::test]
async fn test_same_message_twice_yields_one_event() {
    let (pipeline, backend) = pipeline_answering("YES", PipelineConfig::default());
    let m = message("m1", "Interview", "Interview on Dec 15 at 2:30pm");

    let first = pipeline.evaluate(&m).await;
    let second = pipeline.evaluate(&m).await;

    assert!(first.outcome.is_accepted());
    assert_eq!(second.outcome, Outcome::Duplicate);
    // The second pass never reached the model.
    assert_eq!(backend.generate_call_count(), 1);
}

#[tokio::test]
async fn test_concurrent_duplicates_yield_one_event() {
    let backend = MockGenerationBackend::new()
        .with_fixed_response("YES")
        .with_latency_ms(20);
    let pipeline = Arc::new(
        EventPipeline::new(
            &PipelineConfig::default(),
            Arc::new(ModelClassifier::new(backend.clone())),
        )
        .with_clock(Arc::new(FixedClock::new(reference()))),
    );
    let m = message("m1", "Interview", "Interview on Dec 15 at 2:30pm");

    let evaluations = join_all((0..8).map(|_| {
        let pipeline = pipeline.clone();
        let m = m.clone();
        tokio::spawn(async move { pipeline.evaluate(&m).await })
    }))
    .await;

    let accepted = evaluations
        .into_iter()
        .map(|r| r.unwrap())
        .filter(|e| e.outcome.is_accepted())
        .count();
    assert_eq!(accepted, 1);
    assert_eq!(backend.generate_call_count(), 1);
}

#[tokio::test]
async fn test_start_equal_to_now_is_emitted() {
    let (pipeline, _) = pipeline_answering("YES", PipelineConfig::default());
    // 2025-12-15 14:30 IST
    let start = Utc.with_ymd_and_hms(2025, 12, 15, 9, 0, 0).unwrap();
    let clock = Arc::new(FixedClock::new(start));
    let pipeline = pipeline.with_clock(clock.clone());

    let eval = pipeline
        .evaluate(&message("m1", "Interview", "Interview on Dec 15 at 2:30pm"))
        .await;
    let event = eval.outcome.event().expect("boundary is inclusive");
    assert_eq!(event.start, start.fixed_offset());

    clock.set(start + Duration::minutes(1));
    let eval = pipeline
        .evaluate(&message("m2", "Interview", "Interview on Dec 15 at 2:30pm"))
        .await;
    assert_eq!(eval.outcome, Outcome::Rejected(RejectReason::PastEvent));
}

#[tokio::test]
async fn test_kolkata_round_trip() {
    let (pipeline, _) = pipeline_answering("YES", PipelineConfig::default());
    let eval = pipeline
        .evaluate(&message("m1", "Interview", "Interview on Dec 15 at 2:30pm"))
        .await;

    let event = eval.outcome.event().expect("accepted");
    assert_eq!(event.start.to_rfc3339(), "2025-12-15T14:30:00+05:30");
    assert_eq!(event.end.to_rfc3339(), "2025-12-15T15:30:00+05:30");
    assert_eq!(event.timezone, "Asia/Kolkata");
    assert_eq!(event.title, "Interview");
    assert_eq!(event.message_id, "m1");
}

#[tokio::test]
async fn test_tomorrow_resolves_against_reference_date() {
    let (pipeline, _) = pipeline_answering("YES", PipelineConfig::default());
    let eval = pipeline
        .evaluate(&message("m1", "Call", "Call tomorrow at 10 AM"))
        .await;

    let event = eval.outcome.event().expect("accepted");
    assert_eq!(event.start.to_rfc3339(), "2025-06-02T10:00:00+05:30");
}

#[tokio::test]
async fn test_team_sync_scores_zero() {
    let (pipeline, _) = pipeline_answering("NO", PipelineConfig::default());
    let eval = pipeline
        .evaluate(&message("m1", "Team Sync", "Thanks, notes are in the folder."))
        .await;

    assert_eq!(eval.score.unwrap().total, 0);
    assert_eq!(eval.outcome, Outcome::Rejected(RejectReason::LowConfidence));
}

#[tokio::test]
async fn test_all_signals_score_six() {
    let (pipeline, _) = pipeline_answering("YES", PipelineConfig::default());
    let eval = pipeline
        .evaluate(&message(
            "m1",
            "Quarterly meeting",
            "Please schedule time for 20 June 2025 at 11am.",
        ))
        .await;

    let score = eval.score.unwrap();
    assert_eq!(score.total, 6);
    assert!(score.breakdown.intent);
    assert!(score.breakdown.temporal);
    assert!(score.breakdown.subject_keyword);
    assert!(score.breakdown.body_keyword);
    let event = eval.outcome.event().expect("accepted");
    assert_eq!(event.description, "Confidence: 6/6");
}

#[tokio::test]
async fn test_model_failure_degrades_to_no_intent() {
    let backend = MockGenerationBackend::new()
        .with_fixed_response("YES")
        .with_failure_rate(1.0);
    let pipeline = EventPipeline::new(
        &PipelineConfig::default(),
        Arc::new(ModelClassifier::new(backend)),
    )
    .with_clock(Arc::new(FixedClock::new(reference())));

    let eval = pipeline
        .evaluate(&message("m1", "Hello", "See you on 15 Dec 2025 at 2:30pm."))
        .await;

    let score = eval.score.unwrap();
    assert!(!score.breakdown.intent);
    // The date alone still meets the default threshold.
    assert_eq!(score.total, 2);
    assert!(eval.outcome.is_accepted());
    // And the next message is still processed.
    let next = pipeline
        .evaluate(&message("m2", "Hello", "nothing"))
        .await;
    assert_eq!(next.outcome, Outcome::Rejected(RejectReason::LowConfidence));
}

#[tokio::test]
async fn test_keyword_mode_matches_model_mode_on_clear_cases() {
    let pipeline = EventPipeline::new(
        &PipelineConfig::default(),
        Arc::new(KeywordClassifier::default()),
    )
    .with_clock(Arc::new(FixedClock::new(reference())));

    let eval = pipeline
        .evaluate(&message("m1", "Interview", "Interview on Dec 15 at 2:30pm"))
        .await;
    assert_eq!(eval.score.unwrap().total, 6);
    assert!(eval.outcome.is_accepted());
}
