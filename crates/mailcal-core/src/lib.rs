//! # mailcal-core
//!
//! Core types, traits, and event-detection stages for mailcal.
//!
//! This crate holds the data model and the pure, I/O-free stages of the
//! detection pipeline:
//! - [`TemporalExtractor`]: finds and normalizes an event start time
//! - [`ConfidenceScorer`]: merges evidence into a 0-6 score
//! - [`EventBuilder`]: produces an [`EventDescriptor`] behind the score,
//!   date, and past-event gates
//! - [`DedupLedger`]: at-most-one evaluation per message id
//!
//! Capabilities consumed from collaborators (clock, model, calendar) are
//! traits in [`traits`].

pub mod builder;
pub mod config;
pub mod defaults;
pub mod error;
pub mod ledger;
pub mod logging;
pub mod models;
pub mod scoring;
pub mod temporal;
pub mod traits;

// Re-export commonly used types at crate root
pub use builder::EventBuilder;
pub use config::{parse_timezone, PipelineConfig};
pub use error::{Error, Result};
pub use ledger::{DedupLedger, LedgerState};
pub use models::*;
pub use scoring::{default_keywords, ConfidenceScorer};
pub use temporal::{ResolvedTemporal, TemporalExtractor};
pub use traits::*;

pub use chrono_tz::Tz;
