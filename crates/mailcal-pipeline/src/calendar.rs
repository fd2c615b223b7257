//! In-process calendar writer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use mailcal_core::{CalendarWriter, Error, EventDescriptor, Result};

/// Calendar that keeps created events in memory.
///
/// Used by evaluation runs and tests in place of a remote calendar. Can be
/// switched into a failing state to exercise write-error handling.
#[derive(Debug, Default)]
pub struct InMemoryCalendar {
    events: Mutex<Vec<(String, EventDescriptor)>>,
    failing: AtomicBool,
}

impl InMemoryCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    /// A calendar whose writes all fail.
    pub fn failing() -> Self {
        let calendar = Self::default();
        calendar.set_failing(true);
        calendar
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(String, EventDescriptor)>> {
        match self.events.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Created events with their assigned ids, in creation order.
    pub fn events(&self) -> Vec<(String, EventDescriptor)> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Events created for a given message.
    pub fn events_for(&self, message_id: &str) -> Vec<EventDescriptor> {
        self.lock()
            .iter()
            .filter(|(_, e)| e.message_id == message_id)
            .map(|(_, e)| e.clone())
            .collect()
    }
}

#[async_trait]
impl CalendarWriter for InMemoryCalendar {
    async fn create_event(&self, event: &EventDescriptor) -> Result<String> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::Calendar("calendar rejected the event".into()));
        }
        let id = Uuid::new_v4().to_string();
        self.lock().push((id.clone(), event.clone()));
        debug!(event_id = %id, message_id = %event.message_id, "Event stored");
        Ok(id)
    }
}
