//! Win32 keyboard adapter: `GetAsyncKeyState` polling and `SendInput` injection.

use crate::{PlatformError, PlatformResult};
use keyloop_core::{KeyCode, KeyInjector, KeyStateSource};
use tracing::debug;
use windows_sys::Win32::UI::Input::KeyboardAndMouse::{
    GetAsyncKeyState, SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, KEYBDINPUT, KEYBD_EVENT_FLAGS,
    KEYEVENTF_EXTENDEDKEY, KEYEVENTF_KEYUP,
};

/// Keys that live on the extended part of the keyboard and need `KEYEVENTF_EXTENDEDKEY`.
fn is_extended(code: KeyCode) -> bool {
    matches!(
        code,
        0x21..=0x28 // PageUp, PageDown, End, Home, arrows
            | 0x2D | 0x2E // Insert, Delete
            | 0x5B | 0x5C // Windows keys
            | 0x6F // keypad divide
            | 0x90 // NumLock
            | 0xA3 | 0xA5 // right Control, right Alt
    )
}

/// Stateless Win32 keyboard: each call goes straight to the OS.
#[derive(Debug, Default, Clone, Copy)]
pub struct WinKeyboard;

impl WinKeyboard {
    pub fn new() -> Self {
        WinKeyboard
    }

    fn send(&self, code: KeyCode, key_up: bool) -> PlatformResult<()> {
        let mut flags: KEYBD_EVENT_FLAGS = 0;
        if is_extended(code) {
            flags |= KEYEVENTF_EXTENDEDKEY;
        }
        if key_up {
            flags |= KEYEVENTF_KEYUP;
        }

        let input = INPUT {
            r#type: INPUT_KEYBOARD,
            Anonymous: INPUT_0 {
                ki: KEYBDINPUT {
                    wVk: code,
                    wScan: 0,
                    dwFlags: flags,
                    time: 0,
                    dwExtraInfo: 0,
                },
            },
        };

        let sent = unsafe { SendInput(1, &input, std::mem::size_of::<INPUT>() as i32) };
        if sent == 0 {
            return Err(PlatformError::InjectionFailed("SendInput returned 0".into()));
        }

        debug!(code, key_up, "injected key");
        Ok(())
    }
}

impl KeyStateSource for WinKeyboard {
    fn is_key_down(&self, code: KeyCode) -> bool {
        let state = unsafe { GetAsyncKeyState(i32::from(code)) };
        (state as u16) & 0x8000 != 0
    }
}

impl KeyInjector for WinKeyboard {
    fn key_down(&self, code: KeyCode) -> Result<(), String> {
        self.send(code, false).map_err(|e| e.to_string())
    }

    fn key_up(&self, code: KeyCode) -> Result<(), String> {
        self.send(code, true).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extended_keys() {
        assert!(is_extended(0x25));
        assert!(is_extended(0xA3));
        assert!(!is_extended(0x41));
        assert!(!is_extended(0xA2));
    }
}
