//! Event probe prompt and answer parsing.
//!
//! The model is asked a single yes/no question about the message. Its free
//! text answer is mapped to a boolean; anything that is not recognisably
//! "yes" or "no" is treated as "no" by the caller.

use once_cell::sync::Lazy;
use regex::Regex;

static ANSWER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(yes|no)\b").expect("answer pattern is valid"));

static CONFIDENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[^\d.])(0(?:\.\d+)?|1(?:\.0+)?|\.\d+)(?:[^\d.]|$)")
        .expect("confidence pattern is valid")
});

/// Parsed model answer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeAnswer {
    pub is_event: bool,
    /// Confidence in `[0, 1]` when the model states one.
    pub confidence: Option<f32>,
}

/// Build the yes/no probe for a message.
///
/// Only the first `body_chars` characters of the body are included.
pub fn event_probe_prompt(subject: &str, body: &str, body_chars: usize) -> String {
    let excerpt: String = body.chars().take(body_chars).collect();
    format!(
        r#"Does this email describe a scheduled event, meeting, or appointment with a date?
Subject: {}
Body: {}

Answer YES or NO:"#,
        subject.trim(),
        excerpt.trim()
    )
}

/// Map a model response to a verdict.
///
/// The first standalone `yes` or `no` decides; an optional number in
/// `[0, 1]` after it is taken as confidence. Returns `None` when the
/// response contains neither word.
pub fn parse_probe_answer(response: &str) -> Option<ProbeAnswer> {
    let m = ANSWER_RE.find(response)?;
    let is_event = m.as_str().eq_ignore_ascii_case("yes");

    let rest = &response[m.end()..];
    let confidence = CONFIDENCE_RE
        .captures(rest)
        .and_then(|c| c.get(1))
        .and_then(|v| v.as_str().parse::<f32>().ok())
        .filter(|v| (0.0..=1.0).contains(v));

    Some(ProbeAnswer {
        is_event,
        confidence,
    })
}
