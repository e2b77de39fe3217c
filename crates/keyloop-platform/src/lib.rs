//! keyloop-platform: platform-specific I/O boundary for keyloop.
//!
//! This crate provides:
//! - Key state polling (`GetAsyncKeyState` on Windows, a global `rdev` hook elsewhere)
//! - Key injection (`SendInput` on Windows, `enigo` elsewhere)
//! - A press-edge feed for the hook capture mode and the global hotkeys
//! - Virtual-key code tables
//!
//! ## Module Structure
//!
//! - `error` - Common error types
//! - `injector` - enigo and no-op injectors
//! - `input_hook` - Global keyboard hook (rdev)
//! - `keycodes` - Virtual-key code conversions
//! - `win32` - Native Windows adapter

mod error;
mod injector;
mod input_hook;
pub mod keycodes;

#[cfg(target_os = "windows")]
mod win32;

pub use error::{PlatformError, PlatformResult};
pub use injector::{EnigoInjector, NoopInjector};
pub use input_hook::RdevKeyboard;
pub use keycodes::key_name;

#[cfg(target_os = "windows")]
pub use win32::WinKeyboard;

use keyloop_core::{CaptureMode, KeyInjector, KeyPressFeed, KeyStateSource};
use std::sync::Arc;
use tracing::info;

/// The collaborators the engine needs, chosen for the current OS.
pub struct PlatformIo {
    pub keys: Arc<dyn KeyStateSource>,
    pub injector: Arc<dyn KeyInjector>,
    pub press_feed: Option<Arc<dyn KeyPressFeed>>,
    /// Global press feed for the record/play hotkeys, available in every capture mode.
    pub hotkeys: Arc<dyn KeyPressFeed>,
}

/// Build the platform adapters for `mode`. `dry_run` swaps in the [`NoopInjector`].
pub fn platform_io(mode: CaptureMode, dry_run: bool) -> PlatformResult<PlatformIo> {
    #[cfg(target_os = "windows")]
    let io = {
        let keyboard = Arc::new(WinKeyboard::new());
        let hook = Arc::new(RdevKeyboard::start());
        let injector: Arc<dyn KeyInjector> = if dry_run {
            Arc::new(NoopInjector)
        } else {
            keyboard.clone()
        };
        let press_feed: Option<Arc<dyn KeyPressFeed>> = match mode {
            CaptureMode::Hook => Some(hook.clone()),
            _ => None,
        };
        info!(?mode, dry_run, "Using Win32 key polling and SendInput");
        PlatformIo { keys: keyboard, injector, press_feed, hotkeys: hook }
    };

    #[cfg(not(target_os = "windows"))]
    let io = {
        let hook = Arc::new(RdevKeyboard::start());
        let injector: Arc<dyn KeyInjector> = if dry_run {
            Arc::new(NoopInjector)
        } else {
            Arc::new(EnigoInjector::new()?)
        };
        let press_feed: Option<Arc<dyn KeyPressFeed>> = match mode {
            CaptureMode::Hook => Some(hook.clone()),
            _ => None,
        };
        info!(?mode, dry_run, "Using rdev key state and enigo injection");
        PlatformIo { keys: hook.clone(), injector, press_feed, hotkeys: hook }
    };

    Ok(io)
}
