//! Fixed US keymap for tests
//!
//! Compiling a real xkb keymap needs the system's keyboard data files, so
//! tests use this small layout instead. It follows the same conventions as
//! xkbcommon: modifier bit positions match the default keymap, Shift is
//! consumed by letters, and Ctrl+Alt is consumed by the function keys that
//! produce `XF86Switch_VT_n`.

use smithay::input::keyboard::xkb::keysyms;

use crate::binding::Keysym;
use crate::input::{KeyState, KeyboardLayout, ModifierIndices};

pub mod keycodes {
    //! Evdev keycodes.
    pub const KEY_BACKSPACE: u32 = 14;
    pub const KEY_Q: u32 = 16;
    pub const KEY_T: u32 = 20;
    pub const KEY_A: u32 = 30;
    pub const KEY_K: u32 = 37;
    pub const KEY_LEFTCTRL: u32 = 29;
    pub const KEY_LEFTSHIFT: u32 = 42;
    pub const KEY_LEFTALT: u32 = 56;
    pub const KEY_F1: u32 = 59;
    pub const KEY_F2: u32 = 60;
    pub const KEY_F3: u32 = 61;
    pub const KEY_F10: u32 = 68;
    pub const KEY_F11: u32 = 87;
    pub const KEY_F12: u32 = 88;
    pub const KEY_LEFTMETA: u32 = 125;
}

use keycodes::*;

const SHIFT: u32 = 0;
const CTRL: u32 = 2;
const ALT: u32 = 3;
const LOGO: u32 = 6;

const ROWS: [(u32, &str); 3] = [(16, "qwertyuiop"), (30, "asdfghjkl"), (44, "zxcvbnm")];

#[derive(Debug, Default)]
pub struct TestLayout {
    held: u32,
}

impl TestLayout {
    pub fn new() -> Self {
        Self::default()
    }

    fn modifier_bit(keycode: u32) -> Option<u32> {
        match keycode {
            KEY_LEFTSHIFT => Some(SHIFT),
            KEY_LEFTCTRL => Some(CTRL),
            KEY_LEFTALT => Some(ALT),
            KEY_LEFTMETA => Some(LOGO),
            _ => None,
        }
    }

    fn is_held(&self, bit: u32) -> bool {
        self.held & (1 << bit) != 0
    }

    fn letter(keycode: u32) -> Option<u8> {
        ROWS.iter().find_map(|(first, row)| {
            let offset = keycode.checked_sub(*first)? as usize;
            row.as_bytes().get(offset).copied()
        })
    }

    fn function_key(keycode: u32) -> Option<u32> {
        match keycode {
            KEY_F1..=KEY_F10 => Some(keycode - KEY_F1 + 1),
            KEY_F11 => Some(11),
            KEY_F12 => Some(12),
            _ => None,
        }
    }

    fn vt_switch(&self, keycode: u32) -> bool {
        Self::function_key(keycode).is_some() && self.is_held(CTRL) && self.is_held(ALT)
    }
}

impl KeyboardLayout for TestLayout {
    fn key_sym(&self, keycode: u32) -> Keysym {
        if let Some(letter) = Self::letter(keycode) {
            let letter = if self.is_held(SHIFT) {
                letter.to_ascii_uppercase()
            } else {
                letter
            };
            return letter as Keysym;
        }
        if let Some(n) = Self::function_key(keycode) {
            return if self.vt_switch(keycode) {
                keysyms::KEY_XF86Switch_VT_1 + n - 1
            } else {
                keysyms::KEY_F1 + n - 1
            };
        }
        match keycode {
            KEY_BACKSPACE => keysyms::KEY_BackSpace,
            KEY_LEFTSHIFT => keysyms::KEY_Shift_L,
            KEY_LEFTCTRL => keysyms::KEY_Control_L,
            KEY_LEFTALT => keysyms::KEY_Alt_L,
            KEY_LEFTMETA => keysyms::KEY_Super_L,
            _ => keysyms::KEY_NoSymbol,
        }
    }

    fn effective_modifiers(&self) -> u32 {
        self.held
    }

    fn remove_consumed(&self, keycode: u32, mask: u32) -> u32 {
        if Self::letter(keycode).is_some() {
            mask & !(1 << SHIFT)
        } else if self.vt_switch(keycode) {
            mask & !(1 << CTRL | 1 << ALT)
        } else {
            mask
        }
    }

    fn modifier_indices(&self) -> ModifierIndices {
        ModifierIndices {
            ctrl: CTRL,
            alt: ALT,
            logo: LOGO,
            shift: SHIFT,
        }
    }

    fn update_key(&mut self, keycode: u32, state: KeyState) {
        let Some(bit) = Self::modifier_bit(keycode) else {
            return;
        };
        match state {
            KeyState::Pressed => self.held |= 1 << bit,
            KeyState::Released => self.held &= !(1 << bit),
        }
    }
}
