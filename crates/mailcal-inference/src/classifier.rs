//! Intent classifiers.
//!
//! Two implementations of [`IntentClassifier`]:
//! - [`ModelClassifier`] asks a generation backend the event probe and maps
//!   its answer to a verdict
//! - [`KeywordClassifier`] matches the configured keyword list
//!
//! Which one runs is decided once by [`select_classifier`].

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use mailcal_core::config::{env_parse, env_string};
use mailcal_core::scoring::{contains_keyword, default_keywords};
use mailcal_core::{
    defaults, ClassificationResult, ClassifierMode, Error, GenerationBackend, IntentClassifier,
    Result,
};

use crate::probe::{event_probe_prompt, parse_probe_answer};

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Requested classifier mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ClassifierSelection {
    /// Use the model when its health check passes, otherwise keywords.
    #[default]
    Auto,
    /// Always use the model.
    Model,
    /// Never contact a model.
    Keyword,
}

impl FromStr for ClassifierSelection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "model" => Ok(Self::Model),
            "keyword" | "keywords" => Ok(Self::Keyword),
            other => Err(Error::Config(format!(
                "unknown classifier mode '{}' (expected auto, model or keyword)",
                other
            ))),
        }
    }
}

impl fmt::Display for ClassifierSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Model => write!(f, "model"),
            Self::Keyword => write!(f, "keyword"),
        }
    }
}

/// Classifier settings.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub selection: ClassifierSelection,
    /// Upper bound on a single model invocation.
    pub timeout: Duration,
    /// Body characters included in the probe prompt.
    pub probe_body_chars: usize,
    /// Keyword list for the fallback classifier.
    pub keywords: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            selection: ClassifierSelection::Auto,
            timeout: Duration::from_secs(defaults::CLASSIFIER_TIMEOUT_SECS),
            probe_body_chars: defaults::PROBE_BODY_CHARS,
            keywords: default_keywords(),
        }
    }
}

impl ClassifierConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `MAILCAL_CLASSIFIER` | `auto` | `auto`, `model` or `keyword` |
    /// | `MAILCAL_CLASSIFIER_TIMEOUT_SECS` | `10` | Per-call model timeout |
    /// | `MAILCAL_PROBE_BODY_CHARS` | `200` | Body excerpt length in the probe |
    ///
    /// The backend location (`OLLAMA_BASE`, `MAILCAL_MODEL`) is read by
    /// [`crate::OllamaBackend::from_env`].
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Some(mode) = env_string("MAILCAL_CLASSIFIER") {
            config.selection = mode.parse()?;
        }
        if let Some(secs) = env_parse::<u64>("MAILCAL_CLASSIFIER_TIMEOUT_SECS")? {
            config.timeout = Duration::from_secs(secs.max(1));
        }
        if let Some(chars) = env_parse::<usize>("MAILCAL_PROBE_BODY_CHARS")? {
            config.probe_body_chars = chars;
        }
        Ok(config)
    }

    pub fn with_selection(mut self, selection: ClassifierSelection) -> Self {
        self.selection = selection;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_probe_body_chars(mut self, chars: usize) -> Self {
        self.probe_body_chars = chars;
        self
    }

    pub fn with_keywords(mut self, keywords: Vec<String>) -> Self {
        self.keywords = keywords;
        self
    }
}

// =============================================================================
// KEYWORD CLASSIFIER
// =============================================================================

/// Keyword presence over subject and body. Never fails, never scores.
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    keywords: Vec<String>,
}

impl KeywordClassifier {
    pub fn new(keywords: Vec<String>) -> Self {
        Self {
            keywords: keywords.into_iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new(default_keywords())
    }
}

#[async_trait]
impl IntentClassifier for KeywordClassifier {
    async fn classify(&self, subject: &str, body: &str) -> ClassificationResult {
        let hit =
            contains_keyword(&self.keywords, subject) || contains_keyword(&self.keywords, body);
        ClassificationResult::from_keywords(hit)
    }

    fn mode(&self) -> ClassifierMode {
        ClassifierMode::Keyword
    }
}

// =============================================================================
// MODEL CLASSIFIER
// =============================================================================

/// Model-backed classifier: one probe per message, bounded by a timeout.
pub struct ModelClassifier<B> {
    backend: B,
    timeout: Duration,
    probe_body_chars: usize,
    failure_reported: AtomicBool,
}

impl<B: GenerationBackend> ModelClassifier<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            timeout: Duration::from_secs(defaults::CLASSIFIER_TIMEOUT_SECS),
            probe_body_chars: defaults::PROBE_BODY_CHARS,
            failure_reported: AtomicBool::new(false),
        }
    }

    pub fn from_config(backend: B, config: &ClassifierConfig) -> Self {
        Self::new(backend)
            .with_timeout(config.timeout)
            .with_probe_body_chars(config.probe_body_chars)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_probe_body_chars(mut self, chars: usize) -> Self {
        self.probe_body_chars = chars;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Whether a backend failure has already been reported at WARN.
    pub fn failure_reported(&self) -> bool {
        self.failure_reported.load(Ordering::Relaxed)
    }

    /// WARN on the first failure of the run, DEBUG afterwards. Returns
    /// `true` when this call logged at WARN.
    fn report_failure(&self, error: &str) -> bool {
        let first = !self.failure_reported.swap(true, Ordering::Relaxed);
        if first {
            warn!(
                model = self.backend.model_name(),
                error,
                "Classifier model failed; treating messages as no event signal"
            );
        } else {
            debug!(model = self.backend.model_name(), error, "Classifier model failed");
        }
        first
    }
}

#[async_trait]
impl<B: GenerationBackend> IntentClassifier for ModelClassifier<B> {
    #[instrument(skip(self, subject, body), fields(subsystem = "inference", component = "classifier", op = "classify", model = self.backend.model_name()))]
    async fn classify(&self, subject: &str, body: &str) -> ClassificationResult {
        let prompt = event_probe_prompt(subject, body, self.probe_body_chars);
        let start = Instant::now();

        let outcome = tokio::time::timeout(self.timeout, self.backend.generate(&prompt)).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(Ok(text)) => match parse_probe_answer(&text) {
                Some(answer) => {
                    debug!(
                        is_event = answer.is_event,
                        response_len = text.len(),
                        duration_ms,
                        "Classifier answered"
                    );
                    ClassificationResult {
                        is_event: answer.is_event,
                        raw_score: answer.confidence,
                    }
                }
                None => {
                    debug!(
                        response_len = text.len(),
                        duration_ms, "Unparseable classifier answer, treating as no"
                    );
                    ClassificationResult::not_event(None)
                }
            },
            Ok(Err(e)) => {
                self.report_failure(&e.to_string());
                ClassificationResult::not_event(None)
            }
            Err(_) => {
                self.report_failure(&format!("timed out after {:?}", self.timeout));
                ClassificationResult::not_event(None)
            }
        }
    }

    fn mode(&self) -> ClassifierMode {
        ClassifierMode::Model
    }
}

// =============================================================================
// SELECTION
// =============================================================================

/// Pick the classifier for this run.
///
/// In `Auto` mode the backend is health-checked once; if it is unreachable
/// the keyword classifier is used for the remainder of the run.
pub async fn select_classifier<B>(
    config: &ClassifierConfig,
    backend: B,
) -> Arc<dyn IntentClassifier>
where
    B: GenerationBackend + 'static,
{
    let model = backend.model_name().to_string();
    match config.selection {
        ClassifierSelection::Keyword => {
            info!(classifier_mode = "keyword", "Keyword classifier selected");
            Arc::new(KeywordClassifier::new(config.keywords.clone()))
        }
        ClassifierSelection::Model => {
            info!(classifier_mode = "model", model = %model, "Model classifier selected");
            Arc::new(ModelClassifier::from_config(backend, config))
        }
        ClassifierSelection::Auto => {
            let healthy = matches!(backend.health_check().await, Ok(true));
            if healthy {
                info!(classifier_mode = "model", model = %model, "Model classifier selected");
                Arc::new(ModelClassifier::from_config(backend, config))
            } else {
                warn!(
                    classifier_mode = "keyword",
                    model = %model,
                    "Classifier model unavailable, falling back to keyword mode"
                );
                Arc::new(KeywordClassifier::new(config.keywords.clone()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockGenerationBackend;

    #[test]
    fn test_selection_parse() {
        assert_eq!("auto".parse::<ClassifierSelection>().unwrap(), ClassifierSelection::Auto);
        assert_eq!("MODEL".parse::<ClassifierSelection>().unwrap(), ClassifierSelection::Model);
        assert_eq!(
            " keyword ".parse::<ClassifierSelection>().unwrap(),
            ClassifierSelection::Keyword
        );
        assert!(matches!(
            "gpu".parse::<ClassifierSelection>(),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_selection_display_roundtrip() {
        for s in [
            ClassifierSelection::Auto,
            ClassifierSelection::Model,
            ClassifierSelection::Keyword,
        ] {
            assert_eq!(s.to_string().parse::<ClassifierSelection>().unwrap(), s);
        }
    }

    #[test]
    fn test_default_config() {
        let config = ClassifierConfig::default();
        assert_eq!(config.selection, ClassifierSelection::Auto);
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.probe_body_chars, 200);
        assert!(!config.keywords.is_empty());
    }

    #[tokio::test]
    async fn test_keyword_classifier_subject_or_body() {
        let c = KeywordClassifier::default();
        assert!(c.classify("Project MEETING", "").await.is_event);
        assert!(c.classify("Hello", "let's schedule it").await.is_event);
        assert!(!c.classify("Team Sync", "nothing here").await.is_event);
        assert!(c.classify("x", "y").await.raw_score.is_none());
        assert_eq!(c.mode(), ClassifierMode::Keyword);
    }

    #[tokio::test]
    async fn test_keyword_classifier_lowercases_keywords() {
        let c = KeywordClassifier::new(vec!["StandUp".into()]);
        assert_eq!(c.keywords(), &["standup".to_string()]);
        assert!(c.classify("Daily standup", "").await.is_event);
    }

    #[tokio::test]
    async fn test_model_classifier_yes() {
        let backend = MockGenerationBackend::new().with_fixed_response("YES");
        let c = ModelClassifier::new(backend.clone());
        let result = c.classify("Interview", "Dec 15").await;
        assert!(result.is_event);
        assert_eq!(c.mode(), ClassifierMode::Model);
        assert_eq!(backend.generate_call_count(), 1);
    }

    #[tokio::test]
    async fn test_model_classifier_carries_confidence() {
        let backend = MockGenerationBackend::new().with_fixed_response("yes 0.9");
        let result = ModelClassifier::new(backend).classify("s", "b").await;
        assert_eq!(result.raw_score, Some(0.9));
    }

    #[tokio::test]
    async fn test_model_classifier_unparseable_is_no() {
        let backend = MockGenerationBackend::new().with_fixed_response("I cannot tell");
        let result = ModelClassifier::new(backend).classify("s", "b").await;
        assert!(!result.is_event);
    }

    #[tokio::test]
    async fn test_model_classifier_error_is_no() {
        let backend = MockGenerationBackend::new()
            .with_fixed_response("YES")
            .with_failure_rate(1.0);
        let c = ModelClassifier::new(backend);
        assert!(!c.classify("s", "b").await.is_event);
        // Second failure is still absorbed.
        assert!(!c.classify("s", "b").await.is_event);
    }

    #[tokio::test]
    async fn test_outage_warns_once() {
        let backend = MockGenerationBackend::new().with_failure_rate(1.0);
        let c = ModelClassifier::new(backend);
        assert!(!c.failure_reported());

        c.classify("s", "b").await;
        assert!(c.failure_reported());

        // Every later failure takes the DEBUG branch.
        assert!(!c.report_failure("still down"));
        c.classify("s", "b").await;
        assert!(!c.report_failure("still down"));
    }

    #[test]
    fn test_report_failure_first_call_only() {
        let c = ModelClassifier::new(MockGenerationBackend::new());
        assert!(c.report_failure("connection refused"));
        assert!(!c.report_failure("connection refused"));
        assert!(!c.report_failure("timed out"));
    }

    #[tokio::test]
    async fn test_successful_answers_do_not_mark_failure() {
        let c = ModelClassifier::new(MockGenerationBackend::new().with_fixed_response("YES"));
        assert!(c.classify("s", "b").await.is_event);
        assert!(!c.failure_reported());
    }

    #[tokio::test]
    async fn test_timeout_counts_as_failure() {
        let backend = MockGenerationBackend::new().with_latency_ms(200);
        let c = ModelClassifier::new(backend).with_timeout(Duration::from_millis(20));
        c.classify("s", "b").await;
        assert!(c.failure_reported());
    }

    #[tokio::test]
    async fn test_model_classifier_timeout_is_no() {
        let backend = MockGenerationBackend::new()
            .with_fixed_response("YES")
            .with_latency_ms(200);
        let c = ModelClassifier::new(backend).with_timeout(Duration::from_millis(20));
        assert!(!c.classify("s", "b").await.is_event);
    }

    #[tokio::test]
    async fn test_model_classifier_prompt_excerpt() {
        let backend = MockGenerationBackend::new();
        let c = ModelClassifier::new(backend.clone()).with_probe_body_chars(5);
        c.classify("Subj", "0123456789").await;
        let calls = backend.get_calls();
        assert!(calls[0].input.contains("Body: 01234\n"));
    }

    #[tokio::test]
    async fn test_select_keyword_never_touches_backend() {
        let backend = MockGenerationBackend::new();
        let config = ClassifierConfig::default().with_selection(ClassifierSelection::Keyword);
        let c = select_classifier(&config, backend.clone()).await;
        assert_eq!(c.mode(), ClassifierMode::Keyword);
        assert!(backend.get_calls().is_empty());
    }

    #[tokio::test]
    async fn test_select_auto_healthy_uses_model() {
        let backend = MockGenerationBackend::new();
        let c = select_classifier(&ClassifierConfig::default(), backend).await;
        assert_eq!(c.mode(), ClassifierMode::Model);
    }

    #[tokio::test]
    async fn test_select_auto_unhealthy_falls_back() {
        let backend = MockGenerationBackend::new().unhealthy();
        let c = select_classifier(&ClassifierConfig::default(), backend.clone()).await;
        assert_eq!(c.mode(), ClassifierMode::Keyword);
        assert_eq!(backend.generate_call_count(), 0);
    }

    #[tokio::test]
    async fn test_select_forced_model_skips_health_check() {
        let backend = MockGenerationBackend::new().unhealthy();
        let config = ClassifierConfig::default().with_selection(ClassifierSelection::Model);
        let c = select_classifier(&config, backend.clone()).await;
        assert_eq!(c.mode(), ClassifierMode::Model);
        assert!(backend.get_calls().is_empty());
    }
}
