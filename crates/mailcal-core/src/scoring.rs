//! Confidence scoring: merge independent evidence into one verdict.
//!
//! | Signal | Points |
//! |--------|--------|
//! | Intent classifier says "event" | 2 |
//! | Temporal extractor resolved a start | 2 |
//! | Event keyword in subject | 1 |
//! | Event keyword in body | 1 |
//!
//! A message is accepted at `total >= threshold` (default 2). Acceptance
//! alone does not create an event; the builder separately requires a start
//! time.

use tracing::debug;

use crate::defaults;
use crate::models::{ClassificationResult, ConfidenceScore, ScoreBreakdown};

/// Combines classifier output, extraction success, and keyword signals.
#[derive(Debug, Clone)]
pub struct ConfidenceScorer {
    keywords: Vec<String>,
    threshold: u8,
    body_scan_chars: usize,
}

impl ConfidenceScorer {
    /// `keywords` are matched case-insensitively as substrings; only the
    /// first `body_scan_chars` characters of the body are scanned.
    pub fn new(keywords: Vec<String>, threshold: u8, body_scan_chars: usize) -> Self {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
            threshold,
            body_scan_chars,
        }
    }

    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// True if `text` contains any configured keyword.
    pub fn keyword_hit(&self, text: &str) -> bool {
        contains_keyword(&self.keywords, text)
    }

    pub fn score(
        &self,
        classification: &ClassificationResult,
        has_temporal: bool,
        subject: &str,
        body: &str,
    ) -> ConfidenceScore {
        let body_prefix: String = body.chars().take(self.body_scan_chars).collect();
        let breakdown = ScoreBreakdown {
            intent: classification.is_event,
            temporal: has_temporal,
            subject_keyword: self.keyword_hit(subject),
            body_keyword: self.keyword_hit(&body_prefix),
        };

        let mut total = 0;
        if breakdown.intent {
            total += defaults::INTENT_POINTS;
        }
        if breakdown.temporal {
            total += defaults::TEMPORAL_POINTS;
        }
        if breakdown.subject_keyword {
            total += defaults::SUBJECT_KEYWORD_POINTS;
        }
        if breakdown.body_keyword {
            total += defaults::BODY_KEYWORD_POINTS;
        }

        let score = ConfidenceScore {
            total,
            threshold: self.threshold,
            breakdown,
        };
        debug!(
            score = score.total,
            accepted = score.is_accepted(),
            ?breakdown,
            "Confidence scored"
        );
        score
    }
}

impl Default for ConfidenceScorer {
    fn default() -> Self {
        Self::new(
            default_keywords(),
            defaults::SCORE_THRESHOLD,
            defaults::BODY_SCAN_CHARS,
        )
    }
}

/// The built-in keyword list as owned strings.
pub fn default_keywords() -> Vec<String> {
    defaults::EVENT_KEYWORDS
        .iter()
        .map(|k| k.to_string())
        .collect()
}

/// Case-insensitive substring match against lowercase `keywords`.
pub fn contains_keyword(keywords: &[String], text: &str) -> bool {
    let lower = text.to_lowercase();
    keywords.iter().any(|k| lower.contains(k.as_str()))
}
