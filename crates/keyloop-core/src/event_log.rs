//! The recorded macro: an ordered key event log behind a single lock.

use crate::KeyEvent;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Ordered sequence of captured key events.
///
/// Each method takes the lock for exactly one operation; nothing holds it across a sleep.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<KeyEvent>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Append one event to the tail. Returns the new length.
    pub fn append(&self, event: KeyEvent) -> usize {
        let mut events = self.lock();
        events.push(event);
        events.len()
    }

    /// Consistent copy of the whole log.
    pub fn snapshot(&self) -> Vec<KeyEvent> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<KeyEvent>> {
        // Push and clear never leave the Vec half-updated, so poisoning is ignored.
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
