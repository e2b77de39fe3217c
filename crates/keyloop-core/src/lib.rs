//! keyloop-core: key macro model + capture/playback engine.
//!
//! Design goal: keep this crate UI-agnostic and platform-agnostic.
//! Platform specific I/O (key state polling, injection, hooks) lives in `keyloop-platform`
//! and is plugged in through the traits in [`platform`].

mod config;
mod engine;
mod event_log;
pub mod platform;
mod player;
mod recorder;
mod status;

#[cfg(test)]
mod test_support;

pub use config::{
    get_config_dir, get_config_path, load_config, load_default_config, CaptureMode, ConfigError,
    ConfigResult, EngineConfig, HotkeyConfig, PlaybackConfig, Repeat, MIN_PLAYBACK_SPEED,
};
pub use engine::{EngineBuilder, EngineEvent, MacroEngine, Refusal, Transition, EVENT_CAPACITY};
pub use event_log::EventLog;
pub use platform::{Clock, KeyInjector, KeyPressFeed, KeyStateSource, MonotonicClock};
pub use status::{EngineStatus, StatusSnapshot};

use serde::Serialize;

/// Virtual-key code identifying a physical key (Win32 `VK_*` numbering).
pub type KeyCode = u16;

/// Lowest code scanned by the polling recorder (`VK_BACK`).
pub const FIRST_SCAN_CODE: KeyCode = 0x08;

/// Highest code scanned by the polling recorder.
pub const LAST_SCAN_CODE: KeyCode = 0xFF;

/// A single captured key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KeyEvent {
    pub code: KeyCode,
    /// Milliseconds since the recording session started.
    pub offset_ms: u64,
}

impl KeyEvent {
    pub fn new(code: KeyCode, offset_ms: u64) -> Self {
        Self { code, offset_ms }
    }
}
