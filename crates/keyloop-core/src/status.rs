//! Lock-free status flags shared between the engine, its threads and the UI.

use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

/// The three coordination flags. Every read and write is a single atomic operation.
#[derive(Debug, Default)]
pub struct EngineStatus {
    recording: AtomicBool,
    playing: AtomicBool,
    macro_available: AtomicBool,
}

impl EngineStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_recording(&self) -> bool {
        self.recording.load(Ordering::SeqCst)
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    pub fn is_macro_available(&self) -> bool {
        self.macro_available.load(Ordering::SeqCst)
    }

    pub(crate) fn set_recording(&self, value: bool) {
        self.recording.store(value, Ordering::SeqCst);
    }

    pub(crate) fn set_playing(&self, value: bool) {
        self.playing.store(value, Ordering::SeqCst);
    }

    pub(crate) fn set_macro_available(&self, value: bool) {
        self.macro_available.store(value, Ordering::SeqCst);
    }
}

/// Point-in-time copy of the status, for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    pub recording: bool,
    pub playing: bool,
    pub macro_available: bool,
    pub event_count: usize,
}

impl fmt::Display for StatusSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.recording {
            write!(f, "Macro recording in progress...")
        } else if self.playing {
            write!(f, "Macro playback in progress...")
        } else if self.macro_available {
            write!(f, "Macro ready for playback ({} keys)", self.event_count)
        } else {
            write!(f, "No macro recorded")
        }
    }
}
