//! Keyboard and pointer input decoding
//!
//! Translates raw evdev key codes and pointer button codes into the
//! platform-agnostic [`Key`] enumeration, keeps the XKB layout state used for
//! modifiers and text, and splits composed key symbols into text codepoints.

use serde::Serialize;
use tracing::{debug, warn};
use xkbcommon::xkb;

/// Offset between evdev key codes and XKB key codes.
const XKB_KEYCODE_OFFSET: u32 = 8;

/// Linux evdev key codes (`linux/input-event-codes.h`)
pub mod codes {
    pub const KEY_ESC: u32 = 1;
    pub const KEY_1: u32 = 2;
    pub const KEY_2: u32 = 3;
    pub const KEY_3: u32 = 4;
    pub const KEY_4: u32 = 5;
    pub const KEY_5: u32 = 6;
    pub const KEY_6: u32 = 7;
    pub const KEY_7: u32 = 8;
    pub const KEY_8: u32 = 9;
    pub const KEY_9: u32 = 10;
    pub const KEY_0: u32 = 11;
    pub const KEY_BACKSPACE: u32 = 14;
    pub const KEY_TAB: u32 = 15;
    pub const KEY_Q: u32 = 16;
    pub const KEY_W: u32 = 17;
    pub const KEY_E: u32 = 18;
    pub const KEY_R: u32 = 19;
    pub const KEY_T: u32 = 20;
    pub const KEY_Y: u32 = 21;
    pub const KEY_U: u32 = 22;
    pub const KEY_I: u32 = 23;
    pub const KEY_O: u32 = 24;
    pub const KEY_P: u32 = 25;
    pub const KEY_ENTER: u32 = 28;
    pub const KEY_LEFTCTRL: u32 = 29;
    pub const KEY_A: u32 = 30;
    pub const KEY_S: u32 = 31;
    pub const KEY_D: u32 = 32;
    pub const KEY_F: u32 = 33;
    pub const KEY_G: u32 = 34;
    pub const KEY_H: u32 = 35;
    pub const KEY_J: u32 = 36;
    pub const KEY_K: u32 = 37;
    pub const KEY_L: u32 = 38;
    pub const KEY_LEFTSHIFT: u32 = 42;
    pub const KEY_Z: u32 = 44;
    pub const KEY_X: u32 = 45;
    pub const KEY_C: u32 = 46;
    pub const KEY_V: u32 = 47;
    pub const KEY_B: u32 = 48;
    pub const KEY_N: u32 = 49;
    pub const KEY_M: u32 = 50;
    pub const KEY_SPACE: u32 = 57;
    pub const KEY_F1: u32 = 59;
    pub const KEY_F2: u32 = 60;
    pub const KEY_F3: u32 = 61;
    pub const KEY_F4: u32 = 62;
    pub const KEY_F5: u32 = 63;
    pub const KEY_F6: u32 = 64;
    pub const KEY_F7: u32 = 65;
    pub const KEY_F8: u32 = 66;
    pub const KEY_F9: u32 = 67;
    pub const KEY_F10: u32 = 68;
    pub const KEY_F11: u32 = 87;
    pub const KEY_F12: u32 = 88;
    pub const KEY_HOME: u32 = 102;
    pub const KEY_UP: u32 = 103;
    pub const KEY_PAGEUP: u32 = 104;
    pub const KEY_LEFT: u32 = 105;
    pub const KEY_RIGHT: u32 = 106;
    pub const KEY_END: u32 = 107;
    pub const KEY_DOWN: u32 = 108;
    pub const KEY_PAGEDOWN: u32 = 109;
    pub const KEY_DELETE: u32 = 111;

    pub const BTN_LEFT: u32 = 0x110;
    pub const BTN_RIGHT: u32 = 0x111;
    pub const BTN_MIDDLE: u32 = 0x112;
}

/// Abstract key identifier delivered with press/release events
#[derive(Serialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Key {
    #[default]
    Null,
    Esc,
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,
    Num0,
    Num1,
    Num2,
    Num3,
    Num4,
    Num5,
    Num6,
    Num7,
    Num8,
    Num9,
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
    J,
    K,
    L,
    M,
    N,
    O,
    P,
    Q,
    R,
    S,
    T,
    U,
    V,
    W,
    X,
    Y,
    Z,
    Space,
    Return,
    Backspace,
    Tab,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    LeftMouseButton,
    MiddleMouseButton,
    RightMouseButton,
}

/// Map an evdev key code to a [`Key`].
///
/// Codes outside the table yield [`Key::Null`]; callers still emit the
/// press/release so that counts stay balanced for unmapped keys.
pub fn key_from_keycode(code: u32) -> Key {
    use codes::*;
    match code {
        KEY_A => Key::A,
        KEY_B => Key::B,
        KEY_C => Key::C,
        KEY_D => Key::D,
        KEY_E => Key::E,
        KEY_F => Key::F,
        KEY_G => Key::G,
        KEY_H => Key::H,
        KEY_I => Key::I,
        KEY_J => Key::J,
        KEY_K => Key::K,
        KEY_L => Key::L,
        KEY_M => Key::M,
        KEY_N => Key::N,
        KEY_O => Key::O,
        KEY_P => Key::P,
        KEY_Q => Key::Q,
        KEY_R => Key::R,
        KEY_S => Key::S,
        KEY_T => Key::T,
        KEY_U => Key::U,
        KEY_V => Key::V,
        KEY_W => Key::W,
        KEY_X => Key::X,
        KEY_Y => Key::Y,
        KEY_Z => Key::Z,
        KEY_0 => Key::Num0,
        KEY_1 => Key::Num1,
        KEY_2 => Key::Num2,
        KEY_3 => Key::Num3,
        KEY_4 => Key::Num4,
        KEY_5 => Key::Num5,
        KEY_6 => Key::Num6,
        KEY_7 => Key::Num7,
        KEY_8 => Key::Num8,
        KEY_9 => Key::Num9,
        KEY_F1 => Key::F1,
        KEY_F2 => Key::F2,
        KEY_F3 => Key::F3,
        KEY_F4 => Key::F4,
        KEY_F5 => Key::F5,
        KEY_F6 => Key::F6,
        KEY_F7 => Key::F7,
        KEY_F8 => Key::F8,
        KEY_F9 => Key::F9,
        KEY_F10 => Key::F10,
        KEY_F11 => Key::F11,
        KEY_F12 => Key::F12,
        KEY_UP => Key::Up,
        KEY_DOWN => Key::Down,
        KEY_LEFT => Key::Left,
        KEY_RIGHT => Key::Right,
        KEY_PAGEUP => Key::PageUp,
        KEY_PAGEDOWN => Key::PageDown,
        KEY_HOME => Key::Home,
        KEY_END => Key::End,
        KEY_SPACE => Key::Space,
        KEY_ENTER => Key::Return,
        KEY_BACKSPACE => Key::Backspace,
        KEY_TAB => Key::Tab,
        KEY_ESC => Key::Esc,
        _ => Key::Null,
    }
}

/// Map a pointer button code to a mouse [`Key`], or `None` for other buttons.
pub fn key_from_button(button: u32) -> Option<Key> {
    match button {
        codes::BTN_LEFT => Some(Key::LeftMouseButton),
        codes::BTN_MIDDLE => Some(Key::MiddleMouseButton),
        codes::BTN_RIGHT => Some(Key::RightMouseButton),
        _ => None,
    }
}

/// Active modifier snapshot attached to every event
#[derive(Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
}

impl Modifiers {
    pub fn is_empty(&self) -> bool {
        !(self.shift || self.ctrl || self.alt)
    }
}

/// Whether a decoded codepoint is delivered as a text event.
///
/// Control characters are filtered, except for tab.
pub fn is_text_codepoint(c: char) -> bool {
    c != '\0' && (c >= ' ' || c == '\t')
}

/// Split a composed key symbol's UTF-8 bytes into deliverable codepoints.
///
/// Decoding stops at the first malformed or truncated sequence, so a garbage
/// tail never produces replacement characters.
pub fn decode_text(utf8: &[u8]) -> Vec<char> {
    let valid = match std::str::from_utf8(utf8) {
        Ok(s) => s,
        // The prefix up to `valid_up_to` is always valid
        Err(e) => std::str::from_utf8(&utf8[..e.valid_up_to()]).unwrap_or_default(),
    };
    valid.chars().filter(|c| is_text_codepoint(*c)).collect()
}

/// XKB layout state for the seat keyboard
///
/// Replaced wholesale every time the compositor sends a new keymap.
pub struct Keyboard {
    context: xkb::Context,
    keymap: Option<xkb::Keymap>,
    state: Option<xkb::State>,
}

impl Default for Keyboard {
    fn default() -> Self {
        Self::new()
    }
}

impl Keyboard {
    pub fn new() -> Self {
        Self {
            context: xkb::Context::new(xkb::CONTEXT_NO_FLAGS),
            keymap: None,
            state: None,
        }
    }

    /// Compile an XKB v1 text keymap, replacing any previous layout.
    pub fn set_keymap(&mut self, keymap: &str) -> anyhow::Result<()> {
        let keymap = keymap.trim_end_matches('\0').to_string();
        let keymap = xkb::Keymap::new_from_string(
            &self.context,
            keymap,
            xkb::KEYMAP_FORMAT_TEXT_V1,
            xkb::KEYMAP_COMPILE_NO_FLAGS,
        )
        .ok_or_else(|| anyhow::anyhow!("failed to compile keymap"))?;

        self.state = Some(xkb::State::new(&keymap));
        self.keymap = Some(keymap);
        debug!("Keymap compiled");
        Ok(())
    }

    /// Whether a keymap has been received and compiled
    pub fn has_keymap(&self) -> bool {
        self.state.is_some()
    }

    /// Apply a `wl_keyboard.modifiers` update.
    pub fn update_modifiers(&mut self, depressed: u32, latched: u32, locked: u32, group: u32) {
        match self.state.as_mut() {
            Some(state) => {
                state.update_mask(depressed, latched, locked, 0, 0, group);
            }
            None => warn!("Modifiers received before keymap"),
        }
    }

    /// Current effective Shift/Ctrl/Alt state.
    pub fn modifiers(&self) -> Modifiers {
        let Some(state) = self.state.as_ref() else {
            return Modifiers::default();
        };
        Modifiers {
            shift: state.mod_name_is_active(xkb::MOD_NAME_SHIFT, xkb::STATE_MODS_EFFECTIVE),
            ctrl: state.mod_name_is_active(xkb::MOD_NAME_CTRL, xkb::STATE_MODS_EFFECTIVE),
            alt: state.mod_name_is_active(xkb::MOD_NAME_ALT, xkb::STATE_MODS_EFFECTIVE),
        }
    }

    /// Text codepoints produced by pressing the given evdev key.
    pub fn text_for_key(&self, code: u32) -> Vec<char> {
        let Some(state) = self.state.as_ref() else {
            return Vec::new();
        };
        let Some(keycode) = code.checked_add(XKB_KEYCODE_OFFSET) else {
            return Vec::new();
        };
        let keysym = state.key_get_one_sym(keycode.into());
        let utf8 = xkb::keysym_to_utf8(keysym);
        decode_text(utf8.as_bytes())
    }
}
