//! Mock generation backend for deterministic testing.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mailcal_inference::mock::MockGenerationBackend;
//! use mailcal_core::GenerationBackend;
//!
//! #[tokio::test]
//! async fn test_with_mock_backend() {
//!     let backend = MockGenerationBackend::new().with_fixed_response("YES");
//!     assert_eq!(backend.generate("prompt").await.unwrap(), "YES");
//! }
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use mailcal_core::{Error, GenerationBackend, Result};

/// Mock generation backend for testing.
#[derive(Clone)]
pub struct MockGenerationBackend {
    config: Arc<MockConfig>,
    call_log: Arc<Mutex<Vec<MockCall>>>,
}

#[derive(Debug, Clone)]
struct MockConfig {
    model: String,
    /// Responses keyed by a substring of the prompt.
    mapped_responses: Vec<(String, String)>,
    exact_responses: HashMap<String, String>,
    default_response: String,
    latency_ms: u64,
    failure_rate: f64,
    healthy: bool,
}

#[derive(Debug, Clone)]
pub struct MockCall {
    pub operation: String,
    pub input: String,
    pub timestamp: std::time::Instant,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            model: "mock-model".to_string(),
            mapped_responses: Vec::new(),
            exact_responses: HashMap::new(),
            default_response: "NO".to_string(),
            latency_ms: 0,
            failure_rate: 0.0,
            healthy: true,
        }
    }
}

impl MockGenerationBackend {
    /// Create a new mock backend that answers "NO" to everything.
    pub fn new() -> Self {
        Self {
            config: Arc::new(MockConfig::default()),
            call_log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Set a fixed response for generation requests.
    pub fn with_fixed_response(mut self, response: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.config).default_response = response.into();
        self
    }

    /// Answer with `output` for prompts equal to `input`.
    pub fn with_response_mapping(
        mut self,
        input: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Arc::make_mut(&mut self.config)
            .exact_responses
            .insert(input.into(), output.into());
        self
    }

    /// Answer with `output` for prompts containing `needle`. First match wins.
    pub fn with_response_containing(
        mut self,
        needle: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Arc::make_mut(&mut self.config)
            .mapped_responses
            .push((needle.into(), output.into()));
        self
    }

    pub fn with_model_name(mut self, model: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.config).model = model.into();
        self
    }

    /// Set simulated latency for all operations.
    pub fn with_latency_ms(mut self, latency_ms: u64) -> Self {
        Arc::make_mut(&mut self.config).latency_ms = latency_ms;
        self
    }

    /// Set failure rate (0.0 - 1.0) for testing error handling.
    pub fn with_failure_rate(mut self, rate: f64) -> Self {
        Arc::make_mut(&mut self.config).failure_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Report the backend as unreachable from `health_check`.
    pub fn unhealthy(mut self) -> Self {
        Arc::make_mut(&mut self.config).healthy = false;
        self
    }

    fn log(&self) -> MutexGuard<'_, Vec<MockCall>> {
        match self.call_log.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Get all logged calls for assertion.
    pub fn get_calls(&self) -> Vec<MockCall> {
        self.log().clone()
    }

    /// Clear the call log.
    pub fn clear_calls(&self) {
        self.log().clear()
    }

    /// Get number of generation calls.
    pub fn generate_call_count(&self) -> usize {
        self.log()
            .iter()
            .filter(|c| c.operation == "generate")
            .count()
    }

    fn log_call(&self, operation: &str, input: &str) {
        self.log().push(MockCall {
            operation: operation.to_string(),
            input: input.to_string(),
            timestamp: std::time::Instant::now(),
        });
    }

    fn should_fail(&self) -> bool {
        use rand::Rng;
        if self.config.failure_rate >= 1.0 {
            true
        } else if self.config.failure_rate > 0.0 {
            rand::thread_rng().gen::<f64>() < self.config.failure_rate
        } else {
            false
        }
    }

    async fn simulate_latency(&self) {
        if self.config.latency_ms > 0 {
            tokio::time::sleep(tokio::time::Duration::from_millis(self.config.latency_ms)).await;
        }
    }

    fn respond(&self, prompt: &str) -> String {
        if let Some(response) = self.config.exact_responses.get(prompt) {
            return response.clone();
        }
        self.config
            .mapped_responses
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .map(|(_, out)| out.clone())
            .unwrap_or_else(|| self.config.default_response.clone())
    }
}

impl Default for MockGenerationBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerationBackend for MockGenerationBackend {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.log_call("generate", prompt);
        self.simulate_latency().await;

        if self.should_fail() {
            return Err(Error::Inference("Simulated failure for testing".into()));
        }
        Ok(self.respond(prompt))
    }

    async fn health_check(&self) -> Result<bool> {
        self.log_call("health_check", "");
        Ok(self.config.healthy)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_backend_default_answer() {
        let backend = MockGenerationBackend::new();
        assert_eq!(backend.generate("anything").await.unwrap(), "NO");
    }

    #[tokio::test]
    async fn test_mock_backend_generate() {
        let backend = MockGenerationBackend::new().with_fixed_response("YES");
        assert_eq!(backend.generate("test prompt").await.unwrap(), "YES");
    }

    #[tokio::test]
    async fn test_mock_backend_response_mapping() {
        let backend = MockGenerationBackend::new()
            .with_response_mapping("hello", "world")
            .with_response_containing("Interview", "YES");

        assert_eq!(backend.generate("hello").await.unwrap(), "world");
        assert_eq!(
            backend.generate("Subject: Interview round").await.unwrap(),
            "YES"
        );
        assert_eq!(backend.generate("other").await.unwrap(), "NO");
    }

    #[tokio::test]
    async fn test_mock_backend_call_logging() {
        let backend = MockGenerationBackend::new();
        backend.generate("p1").await.unwrap();
        backend.generate("p2").await.unwrap();
        backend.health_check().await.unwrap();

        assert_eq!(backend.generate_call_count(), 2);
        assert_eq!(backend.get_calls().len(), 3);

        backend.clear_calls();
        assert!(backend.get_calls().is_empty());
    }

    #[tokio::test]
    async fn test_mock_backend_clones_share_log() {
        let backend = MockGenerationBackend::new();
        let clone = backend.clone();
        clone.generate("p").await.unwrap();
        assert_eq!(backend.generate_call_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_backend_failure_simulation() {
        let backend = MockGenerationBackend::new().with_failure_rate(1.0);
        assert!(matches!(
            backend.generate("test").await,
            Err(Error::Inference(_))
        ));
    }

    #[tokio::test]
    async fn test_mock_backend_health() {
        assert!(MockGenerationBackend::new().health_check().await.unwrap());
        assert!(!MockGenerationBackend::new()
            .unhealthy()
            .health_check()
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_mock_backend_latency_simulation() {
        let backend = MockGenerationBackend::new().with_latency_ms(50);

        let start = std::time::Instant::now();
        backend.generate("test").await.unwrap();
        assert!(start.elapsed().as_millis() >= 50, "Should simulate latency");
    }
}
