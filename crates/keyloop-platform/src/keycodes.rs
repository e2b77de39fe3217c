//! Virtual-key code tables: `rdev::Key` -> VK, VK -> `enigo::Key`, and display names.

use keyloop_core::KeyCode;
use rdev::Key as RdevKey;

pub const VK_SHIFT: KeyCode = 0x10;
pub const VK_CONTROL: KeyCode = 0x11;
pub const VK_MENU: KeyCode = 0x12;
pub const VK_LSHIFT: KeyCode = 0xA0;
pub const VK_RSHIFT: KeyCode = 0xA1;
pub const VK_LCONTROL: KeyCode = 0xA2;
pub const VK_RCONTROL: KeyCode = 0xA3;
pub const VK_LMENU: KeyCode = 0xA4;
pub const VK_RMENU: KeyCode = 0xA5;

/// Sided keys reported by rdev, with their Win32 virtual-key codes.
const RDEV_KEYS: &[(KeyCode, RdevKey)] = &[
    (0x08, RdevKey::Backspace),
    (0x09, RdevKey::Tab),
    (0x0D, RdevKey::Return),
    (0x13, RdevKey::Pause),
    (0x14, RdevKey::CapsLock),
    (0x1B, RdevKey::Escape),
    (0x20, RdevKey::Space),
    (0x21, RdevKey::PageUp),
    (0x22, RdevKey::PageDown),
    (0x23, RdevKey::End),
    (0x24, RdevKey::Home),
    (0x25, RdevKey::LeftArrow),
    (0x26, RdevKey::UpArrow),
    (0x27, RdevKey::RightArrow),
    (0x28, RdevKey::DownArrow),
    (0x2C, RdevKey::PrintScreen),
    (0x2D, RdevKey::Insert),
    (0x2E, RdevKey::Delete),
    (0x30, RdevKey::Num0),
    (0x31, RdevKey::Num1),
    (0x32, RdevKey::Num2),
    (0x33, RdevKey::Num3),
    (0x34, RdevKey::Num4),
    (0x35, RdevKey::Num5),
    (0x36, RdevKey::Num6),
    (0x37, RdevKey::Num7),
    (0x38, RdevKey::Num8),
    (0x39, RdevKey::Num9),
    (0x41, RdevKey::KeyA),
    (0x42, RdevKey::KeyB),
    (0x43, RdevKey::KeyC),
    (0x44, RdevKey::KeyD),
    (0x45, RdevKey::KeyE),
    (0x46, RdevKey::KeyF),
    (0x47, RdevKey::KeyG),
    (0x48, RdevKey::KeyH),
    (0x49, RdevKey::KeyI),
    (0x4A, RdevKey::KeyJ),
    (0x4B, RdevKey::KeyK),
    (0x4C, RdevKey::KeyL),
    (0x4D, RdevKey::KeyM),
    (0x4E, RdevKey::KeyN),
    (0x4F, RdevKey::KeyO),
    (0x50, RdevKey::KeyP),
    (0x51, RdevKey::KeyQ),
    (0x52, RdevKey::KeyR),
    (0x53, RdevKey::KeyS),
    (0x54, RdevKey::KeyT),
    (0x55, RdevKey::KeyU),
    (0x56, RdevKey::KeyV),
    (0x57, RdevKey::KeyW),
    (0x58, RdevKey::KeyX),
    (0x59, RdevKey::KeyY),
    (0x5A, RdevKey::KeyZ),
    (0x5B, RdevKey::MetaLeft),
    (0x5C, RdevKey::MetaRight),
    (0x60, RdevKey::Kp0),
    (0x61, RdevKey::Kp1),
    (0x62, RdevKey::Kp2),
    (0x63, RdevKey::Kp3),
    (0x64, RdevKey::Kp4),
    (0x65, RdevKey::Kp5),
    (0x66, RdevKey::Kp6),
    (0x67, RdevKey::Kp7),
    (0x68, RdevKey::Kp8),
    (0x69, RdevKey::Kp9),
    (0x6A, RdevKey::KpMultiply),
    (0x6B, RdevKey::KpPlus),
    (0x6D, RdevKey::KpMinus),
    (0x6E, RdevKey::KpDelete),
    (0x6F, RdevKey::KpDivide),
    (0x70, RdevKey::F1),
    (0x71, RdevKey::F2),
    (0x72, RdevKey::F3),
    (0x73, RdevKey::F4),
    (0x74, RdevKey::F5),
    (0x75, RdevKey::F6),
    (0x76, RdevKey::F7),
    (0x77, RdevKey::F8),
    (0x78, RdevKey::F9),
    (0x79, RdevKey::F10),
    (0x7A, RdevKey::F11),
    (0x7B, RdevKey::F12),
    (0x90, RdevKey::NumLock),
    (0x91, RdevKey::ScrollLock),
    (VK_LSHIFT, RdevKey::ShiftLeft),
    (VK_RSHIFT, RdevKey::ShiftRight),
    (VK_LCONTROL, RdevKey::ControlLeft),
    (VK_RCONTROL, RdevKey::ControlRight),
    (VK_LMENU, RdevKey::Alt),
    (VK_RMENU, RdevKey::AltGr),
    (0xBA, RdevKey::SemiColon),
    (0xBB, RdevKey::Equal),
    (0xBC, RdevKey::Comma),
    (0xBD, RdevKey::Minus),
    (0xBE, RdevKey::Dot),
    (0xBF, RdevKey::Slash),
    (0xC0, RdevKey::BackQuote),
    (0xDB, RdevKey::LeftBracket),
    (0xDC, RdevKey::BackSlash),
    (0xDD, RdevKey::RightBracket),
    (0xDE, RdevKey::Quote),
    (0xE2, RdevKey::IntlBackslash),
];

/// Virtual-key code for an rdev key, if it has one.
pub fn vk_from_rdev(key: RdevKey) -> Option<KeyCode> {
    RDEV_KEYS
        .iter()
        .find(|(_, k)| *k == key)
        .map(|(code, _)| *code)
}

/// Sided codes folded into a generic modifier code, as `GetAsyncKeyState` reports them.
pub fn sided_codes(code: KeyCode) -> Option<[KeyCode; 2]> {
    match code {
        VK_SHIFT => Some([VK_LSHIFT, VK_RSHIFT]),
        VK_CONTROL => Some([VK_LCONTROL, VK_RCONTROL]),
        VK_MENU => Some([VK_LMENU, VK_RMENU]),
        _ => None,
    }
}

/// Punctuation and keypad keys that enigo types as characters.
fn key_char(code: KeyCode) -> Option<char> {
    let c = match code {
        0x30..=0x39 => char::from(b'0' + (code - 0x30) as u8),
        0x41..=0x5A => char::from(b'a' + (code - 0x41) as u8),
        0x60..=0x69 => char::from(b'0' + (code - 0x60) as u8),
        0x6A => '*',
        0x6B => '+',
        0x6D | 0xBD => '-',
        0x6E | 0xBE => '.',
        0x6F | 0xBF => '/',
        0xBA => ';',
        0xBB => '=',
        0xBC => ',',
        0xC0 => '`',
        0xDB => '[',
        0xDC | 0xE2 => '\\',
        0xDD => ']',
        0xDE => '\'',
        _ => return None,
    };
    Some(c)
}

/// enigo key for a virtual-key code.
pub fn enigo_key(code: KeyCode) -> Option<enigo::Key> {
    use enigo::Key;

    if let Some(c) = key_char(code) {
        return Some(Key::Unicode(c));
    }

    let key = match code {
        0x08 => Key::Backspace,
        0x09 => Key::Tab,
        0x0D => Key::Return,
        0x13 => Key::Pause,
        0x14 => Key::CapsLock,
        0x1B => Key::Escape,
        0x20 => Key::Space,
        0x21 => Key::PageUp,
        0x22 => Key::PageDown,
        0x23 => Key::End,
        0x24 => Key::Home,
        0x25 => Key::LeftArrow,
        0x26 => Key::UpArrow,
        0x27 => Key::RightArrow,
        0x28 => Key::DownArrow,
        0x2C => Key::PrintScr,
        0x2D => Key::Insert,
        0x2E => Key::Delete,
        0x5B | 0x5C => Key::Meta,
        0x70 => Key::F1,
        0x71 => Key::F2,
        0x72 => Key::F3,
        0x73 => Key::F4,
        0x74 => Key::F5,
        0x75 => Key::F6,
        0x76 => Key::F7,
        0x77 => Key::F8,
        0x78 => Key::F9,
        0x79 => Key::F10,
        0x7A => Key::F11,
        0x7B => Key::F12,
        0x90 => Key::Numlock,
        VK_SHIFT | VK_LSHIFT => Key::Shift,
        VK_RSHIFT => Key::RShift,
        VK_CONTROL | VK_LCONTROL => Key::Control,
        VK_RCONTROL => Key::RControl,
        // enigo 0.3 doesn't distinguish left/right Alt
        VK_MENU | VK_LMENU | VK_RMENU => Key::Alt,
        _ => return None,
    };
    Some(key)
}

/// Human readable name for logs and the console.
pub fn key_name(code: KeyCode) -> String {
    let name = match code {
        0x08 => "Backspace",
        0x09 => "Tab",
        0x0D => "Enter",
        0x13 => "Pause",
        0x14 => "CapsLock",
        0x1B => "Escape",
        0x20 => "Space",
        0x21 => "PageUp",
        0x22 => "PageDown",
        0x23 => "End",
        0x24 => "Home",
        0x25 => "Left",
        0x26 => "Up",
        0x27 => "Right",
        0x28 => "Down",
        0x2C => "PrintScreen",
        0x2D => "Insert",
        0x2E => "Delete",
        0x5B => "MetaLeft",
        0x5C => "MetaRight",
        0x90 => "NumLock",
        0x91 => "ScrollLock",
        VK_SHIFT => "Shift",
        VK_CONTROL => "Control",
        VK_MENU => "Alt",
        VK_LSHIFT => "ShiftLeft",
        VK_RSHIFT => "ShiftRight",
        VK_LCONTROL => "ControlLeft",
        VK_RCONTROL => "ControlRight",
        VK_LMENU => "AltLeft",
        VK_RMENU => "AltRight",
        0x70..=0x7B => return format!("F{}", code - 0x70 + 1),
        0x60..=0x69 => return format!("Kp{}", code - 0x60),
        0x30..=0x39 | 0x41..=0x5A => return char::from(code as u8).to_string(),
        _ => match key_char(code) {
            Some(c) => return c.to_string(),
            None => return format!("0x{code:02X}"),
        },
    };
    name.to_string()
}
