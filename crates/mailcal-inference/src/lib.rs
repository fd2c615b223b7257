//! # mailcal-inference
//!
//! Intent classification for mailcal.
//!
//! This crate provides:
//! - The event probe prompt and its answer parser
//! - A model-backed and a keyword-backed [`IntentClassifier`]
//! - One-shot classifier selection with keyword fallback
//! - Ollama generation backend (default)
//!
//! # Feature Flags
//!
//! - `ollama` (default): Enable Ollama backend
//! - `mock`: Expose [`mock::MockGenerationBackend`] to dependent crates
//!
//! # Example
//!
//! ```rust,no_run
//! use mailcal_inference::{select_classifier, ClassifierConfig, OllamaBackend};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ClassifierConfig::from_env().unwrap();
//!     let classifier = select_classifier(&config, OllamaBackend::from_env()).await;
//!     let verdict = classifier.classify("Interview", "Dec 15 at 2:30pm").await;
//!     println!("event: {}", verdict.is_event);
//! }
//! ```

pub mod classifier;
pub mod probe;

#[cfg(feature = "ollama")]
pub mod ollama;

// Mock generation backend for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock;

// Re-export core types
pub use mailcal_core::*;

#[cfg(feature = "ollama")]
pub use ollama::OllamaBackend;

pub use classifier::{
    select_classifier, ClassifierConfig, ClassifierSelection, KeywordClassifier, ModelClassifier,
};
pub use probe::{event_probe_prompt, parse_probe_answer, ProbeAnswer};
