//! Collaborator traits implemented by `keyloop-platform` (and by fakes in tests).

use crate::KeyCode;
use crossbeam_channel::Receiver;
use std::thread;
use std::time::{Duration, Instant};

/// Point-in-time query of system-wide key state.
pub trait KeyStateSource: Send + Sync {
    fn is_key_down(&self, code: KeyCode) -> bool;
}

/// Synthetic system-wide key input.
///
/// Errors are plain strings so this crate stays independent of platform error types.
pub trait KeyInjector: Send + Sync {
    fn key_down(&self, code: KeyCode) -> Result<(), String>;
    fn key_up(&self, code: KeyCode) -> Result<(), String>;
}

/// Event-driven source of key press edges, used by the hook capture mode.
///
/// Each subscription receives every press edge observed after the call.
/// Auto-repeat must already be filtered out by the implementation.
pub trait KeyPressFeed: Send + Sync {
    fn subscribe(&self) -> Receiver<KeyCode>;
}

/// Monotonic millisecond clock.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;

    fn sleep(&self, ms: u64) {
        thread::sleep(Duration::from_millis(ms));
    }
}

/// Real clock measuring milliseconds since its creation.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}
