//! # mailcal-pipeline
//!
//! Message evaluation for mailcal: the detection pipeline, a concurrent
//! worker that feeds it, and detection-quality evaluation.
//!
//! This crate provides:
//! - [`EventPipeline`]: ledger claim, extraction, classification, scoring
//!   and event building for one message
//! - [`MessageWorker`]: bounded queue, concurrent evaluation, calendar
//!   writes, progress events via broadcast channel
//! - [`eval`]: labelled detection suites and precision/recall reports
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use mailcal_pipeline::{EventPipeline, InMemoryCalendar, WorkerBuilder, WorkerConfig};
//! use mailcal_inference::{select_classifier, ClassifierConfig, OllamaBackend};
//!
//! let config = PipelineConfig::from_env()?;
//! let classifier = select_classifier(&ClassifierConfig::from_env()?, OllamaBackend::from_env()).await;
//!
//! let worker = WorkerBuilder::new(EventPipeline::new(&config, classifier), Arc::new(InMemoryCalendar::new()))
//!     .with_config(WorkerConfig::from_env()?)
//!     .build();
//!
//! // Start worker and get handle
//! let handle = worker.start();
//! let mut events = handle.events();
//!
//! handle.submit(message).await?;
//!
//! // Graceful shutdown drains queued messages
//! handle.shutdown().await?;
//! ```

pub mod calendar;
pub mod eval;
pub mod pipeline;
pub mod worker;

// Re-export core types
pub use mailcal_core::*;

pub use calendar::InMemoryCalendar;
pub use eval::{run_suite, smoke_suite, DetectionCase, DetectionReport};
pub use pipeline::{Evaluation, EventPipeline, Outcome};
pub use worker::{MessageWorker, WorkerBuilder, WorkerConfig, WorkerEvent, WorkerHandle};
