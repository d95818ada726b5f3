//! xkbcommon-backed keyboard layout

use anyhow::Context;
use smithay::input::keyboard::xkb;

use super::{KeyState, KeyboardLayout, ModifierIndices, EVDEV_OFFSET};
use crate::binding::Keysym;
use crate::config::XkbConfig;

pub struct XkbLayout {
    state: xkb::State,
    indices: ModifierIndices,
}

impl XkbLayout {
    pub fn new(config: &XkbConfig) -> anyhow::Result<Self> {
        let context = xkb::Context::new(xkb::CONTEXT_NO_FLAGS);
        let keymap = xkb::Keymap::new_from_names(
            &context,
            &config.rules,
            &config.model,
            &config.layout,
            &config.variant,
            config.options.clone(),
            xkb::KEYMAP_COMPILE_NO_FLAGS,
        )
        .with_context(|| format!("could not compile keymap for layout {:?}", config.layout))?;

        let indices = ModifierIndices {
            ctrl: keymap.mod_get_index(xkb::MOD_NAME_CTRL),
            alt: keymap.mod_get_index(xkb::MOD_NAME_ALT),
            logo: keymap.mod_get_index(xkb::MOD_NAME_LOGO),
            shift: keymap.mod_get_index(xkb::MOD_NAME_SHIFT),
        };

        Ok(Self {
            state: xkb::State::new(&keymap),
            indices,
        })
    }
}

/// Evdev codes near `u32::MAX` saturate to an unmapped keycode.
fn xkb_keycode(keycode: u32) -> xkb::Keycode {
    xkb::Keycode::from(keycode.saturating_add(EVDEV_OFFSET))
}

impl KeyboardLayout for XkbLayout {
    fn key_sym(&self, keycode: u32) -> Keysym {
        self.state.key_get_one_sym(xkb_keycode(keycode)).raw()
    }

    fn effective_modifiers(&self) -> u32 {
        self.state.serialize_mods(xkb::STATE_MODS_EFFECTIVE)
    }

    fn remove_consumed(&self, keycode: u32, mask: u32) -> u32 {
        self.state
            .mod_mask_remove_consumed(xkb_keycode(keycode), mask)
    }

    fn modifier_indices(&self) -> ModifierIndices {
        self.indices
    }

    fn update_key(&mut self, keycode: u32, state: KeyState) {
        let direction = match state {
            KeyState::Pressed => xkb::KeyDirection::Down,
            KeyState::Released => xkb::KeyDirection::Up,
        };
        self.state.update_key(xkb_keycode(keycode), direction);
    }
}
