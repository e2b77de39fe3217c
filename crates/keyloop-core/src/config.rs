//! Engine configuration and its on-disk JSON form.

use crate::{KeyCode, FIRST_SCAN_CODE, LAST_SCAN_CODE};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Slowest accepted playback speed multiplier.
pub const MIN_PLAYBACK_SPEED: f32 = 0.01;

/// How the recorder observes key presses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureMode {
    /// Scan the key range, blocking on each pressed key until it is released.
    /// Overlapping holds are not captured correctly.
    #[default]
    Sequential,
    /// Scan the key range, tracking held keys without blocking.
    /// Every press edge is captured, including overlapping holds.
    Overlapping,
    /// Consume press edges from a platform hook instead of polling.
    Hook,
}

/// How many times the macro is replayed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Repeat {
    #[default]
    Forever,
    Times(u32),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Speed multiplier for replay. 1.0 means real-time.
    pub speed: f32,
    pub repeat: Repeat,
    /// Longest single sleep while waiting for the next event, so stop requests are seen promptly.
    pub stop_check_ms: u64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            speed: 1.0,
            repeat: Repeat::Forever,
            stop_check_ms: 50,
        }
    }
}

/// Global hotkeys that toggle recording and playback. Their codes are never captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HotkeyConfig {
    /// Default F9.
    pub record: KeyCode,
    /// Default F10.
    pub play: KeyCode,
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        Self { record: 0x78, play: 0x79 }
    }
}

impl HotkeyConfig {
    pub fn codes(&self) -> [KeyCode; 2] {
        [self.record, self.play]
    }

    pub fn contains(&self, code: KeyCode) -> bool {
        self.codes().contains(&code)
    }
}

/// Configuration for the macro engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub capture: CaptureMode,
    /// First key code scanned by the polling capture modes (inclusive).
    pub first_code: KeyCode,
    /// Last key code scanned by the polling capture modes (inclusive).
    pub last_code: KeyCode,
    /// Interval between polls while waiting for a held key to be released.
    pub release_poll_ms: u64,
    /// Pause after each full pass over the key range.
    pub scan_pause_ms: u64,
    pub playback: PlaybackConfig,
    pub hotkeys: HotkeyConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            capture: CaptureMode::Sequential,
            first_code: FIRST_SCAN_CODE,
            last_code: LAST_SCAN_CODE,
            release_poll_ms: 10,
            scan_pause_ms: 1,
            playback: PlaybackConfig::default(),
            hotkeys: HotkeyConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.first_code > self.last_code {
            return Err(ConfigError::Invalid(format!(
                "first_code {:#04x} is above last_code {:#04x}",
                self.first_code, self.last_code
            )));
        }
        if self.last_code > LAST_SCAN_CODE {
            return Err(ConfigError::Invalid(format!(
                "last_code {:#04x} is outside the virtual-key range",
                self.last_code
            )));
        }
        let speed = self.playback.speed;
        if !speed.is_finite() || speed < MIN_PLAYBACK_SPEED {
            return Err(ConfigError::Invalid(format!(
                "playback speed must be a finite number of at least {MIN_PLAYBACK_SPEED}, got {speed}"
            )));
        }
        if self.playback.repeat == Repeat::Times(0) {
            return Err(ConfigError::Invalid("repeat count must be at least 1".into()));
        }
        if self.playback.stop_check_ms == 0 {
            return Err(ConfigError::Invalid("stop_check_ms must be at least 1".into()));
        }
        let HotkeyConfig { record, play } = self.hotkeys;
        if record == play {
            return Err(ConfigError::Invalid(format!(
                "record and play hotkeys are both {record:#04x}"
            )));
        }
        if record > LAST_SCAN_CODE || play > LAST_SCAN_CODE {
            return Err(ConfigError::Invalid(
                "hotkeys must be virtual-key codes up to 0xff".into(),
            ));
        }
        Ok(())
    }
}

/// Get the config directory for keyloop.
pub fn get_config_dir() -> PathBuf {
    let base = dirs_next::config_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("keyloop")
}

/// Get the default config file path.
pub fn get_config_path() -> PathBuf {
    get_config_dir().join("config.json")
}

/// Load and validate a config file.
pub fn load_config(path: &Path) -> ConfigResult<EngineConfig> {
    let json = fs::read_to_string(path)?;
    let config: EngineConfig = serde_json::from_str(&json)?;
    config.validate()?;
    debug!(?path, ?config, "Loaded config");
    Ok(config)
}

/// Load the config from the default location, or defaults if no file exists.
pub fn load_default_config() -> ConfigResult<EngineConfig> {
    let path = get_config_path();
    if !path.exists() {
        info!(?path, "No config file, using defaults");
        return Ok(EngineConfig::default());
    }
    load_config(&path)
}
