//! Message dedup ledger.
//!
//! Records every message id that has entered evaluation so that
//! at-least-once delivery produces at most one event per message. State
//! lives for the process lifetime only.

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::{debug, trace};

/// Ledger state of a message id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerState {
    /// Evaluation has started and not yet finished.
    InFlight,
    /// Evaluation finished (event created or not).
    Processed,
}

/// Thread-safe record of evaluated messages.
#[derive(Debug, Default)]
pub struct DedupLedger {
    entries: Mutex<HashMap<String, LedgerState>>,
}

impl DedupLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_entries<R>(&self, f: impl FnOnce(&mut HashMap<String, LedgerState>) -> R) -> R {
        match self.entries.lock() {
            Ok(mut guard) => f(&mut guard),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }

    /// True once the message has entered evaluation, finished or not.
    pub fn has_been_processed(&self, message_id: &str) -> bool {
        self.with_entries(|entries| entries.contains_key(message_id))
    }

    /// Record the message as fully evaluated.
    pub fn mark_processed(&self, message_id: &str) {
        self.with_entries(|entries| {
            entries.insert(message_id.to_string(), LedgerState::Processed);
        });
        trace!(message_id, "Marked processed");
    }

    /// Atomically check and claim a message for evaluation.
    ///
    /// Returns `true` if the caller now owns the message, `false` if it was
    /// already claimed or processed. Two concurrent calls for the same id
    /// never both return `true`.
    pub fn try_begin(&self, message_id: &str) -> bool {
        let claimed = self.with_entries(|entries| {
            if entries.contains_key(message_id) {
                false
            } else {
                entries.insert(message_id.to_string(), LedgerState::InFlight);
                true
            }
        });
        if !claimed {
            debug!(message_id, "Message already in ledger");
        }
        claimed
    }

    pub fn state(&self, message_id: &str) -> Option<LedgerState> {
        self.with_entries(|entries| entries.get(message_id).copied())
    }

    /// Number of ids recorded, in flight or processed.
    pub fn len(&self) -> usize {
        self.with_entries(|entries| entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of ids whose evaluation has finished.
    pub fn processed_count(&self) -> usize {
        self.with_entries(|entries| {
            entries
                .values()
                .filter(|s| **s == LedgerState::Processed)
                .count()
        })
    }
}
