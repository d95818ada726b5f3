//! Keyboard and pointer routing
//!
//! Key presses are offered to the compositor's bindings before reaching any
//! client. Modifiers the layout consumed to produce the keysym are removed
//! first, so Shift+a matches a binding on `A` without Shift. Pointer focus
//! goes to the first surface, in stacking order, whose input region holds
//! the pointer.

pub mod xkb;

pub use xkb::XkbLayout;

use smithay::utils::{Logical, Point};
use tracing::{debug, trace};

use crate::backend::SeatEvent;
use crate::binding::{Keysym, Modifiers};
use crate::compositor::Compositor;
use crate::surface::{SurfaceId, SurfaceList};

/// Evdev keycodes sit this far below xkb keycodes.
pub const EVDEV_OFFSET: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    Released,
    Pressed,
}

/// Bit positions of the canonical modifiers in the layout's modifier mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModifierIndices {
    pub ctrl: u32,
    pub alt: u32,
    pub logo: u32,
    pub shift: u32,
}

/// Keymap and modifier state of the seat keyboard.
pub trait KeyboardLayout {
    /// Keysym `keycode` produces in the current state.
    fn key_sym(&self, keycode: u32) -> Keysym;

    /// Serialized effective modifier mask.
    fn effective_modifiers(&self) -> u32;

    /// `mask` without the modifiers consumed to produce `keycode`'s keysym.
    fn remove_consumed(&self, keycode: u32, mask: u32) -> u32;

    fn modifier_indices(&self) -> ModifierIndices;

    fn update_key(&mut self, keycode: u32, state: KeyState);
}

/// Canonical modifiers held for `keycode`, consumed ones excluded.
pub fn active_modifiers(layout: &dyn KeyboardLayout, keycode: u32) -> Modifiers {
    let mask = layout.remove_consumed(keycode, layout.effective_modifiers());
    let indices = layout.modifier_indices();
    // An index past the mask width means the keymap lacks that modifier.
    let held = |index: u32| index < u32::BITS && mask & (1 << index) != 0;

    let mut modifiers = Modifiers::empty();
    modifiers.set(Modifiers::CTRL, held(indices.ctrl));
    modifiers.set(Modifiers::ALT, held(indices.alt));
    modifiers.set(Modifiers::LOGO, held(indices.logo));
    modifiers.set(Modifiers::SHIFT, held(indices.shift));
    modifiers
}

/// Front-most surface accepting input at `location`.
pub fn surface_under(surfaces: &SurfaceList, location: Point<f64, Logical>) -> Option<SurfaceId> {
    // `as` saturates, so keep the translation saturating too.
    let (x, y) = (location.x as i32, location.y as i32);
    surfaces
        .iter()
        .find(|surface| {
            let origin = surface.geometry().loc;
            let local = Point::from((x.saturating_sub(origin.x), y.saturating_sub(origin.y)));
            surface.accepts_input(local)
        })
        .map(|surface| surface.id())
}

pub trait KeyboardHandler {
    /// Returns true if the key was consumed and must not reach a client.
    fn key(&mut self, time: u32, keycode: u32, state: KeyState) -> bool;
}

pub trait PointerHandler {
    /// Recompute pointer focus at the current location.
    fn focus(&mut self);

    /// Returns true if the motion was consumed.
    fn motion(&mut self, time: u32, location: Point<f64, Logical>) -> bool;
}

impl KeyboardHandler for Compositor {
    fn key(&mut self, time: u32, keycode: u32, state: KeyState) -> bool {
        if state != KeyState::Pressed {
            return false;
        }

        let (keysym, modifiers) = {
            let layout = self.seat.keyboard_layout();
            (layout.key_sym(keycode), active_modifiers(layout, keycode))
        };

        let Some(handler) = self
            .key_bindings
            .find(keysym, modifiers)
            .map(|binding| binding.handler())
        else {
            return false;
        };

        debug!("Key binding {:#x} ({:?})", keysym, modifiers);
        handler(self, time, keysym);
        true
    }
}

impl PointerHandler for Compositor {
    fn focus(&mut self) {
        let focus = surface_under(&self.surfaces, self.pointer_location);
        if focus != self.pointer_focus {
            debug!("Pointer focus {:?} -> {:?}", self.pointer_focus, focus);
            self.pointer_focus = focus;
            self.seat.set_pointer_focus(focus);
        }
    }

    fn motion(&mut self, time: u32, location: Point<f64, Logical>) -> bool {
        trace!("Pointer motion at {} to {:?}", time, location);
        self.pointer_location = location;
        self.focus();
        false
    }
}

impl Compositor {
    pub fn handle_seat_event(&mut self, event: SeatEvent) {
        match event {
            SeatEvent::Key {
                time,
                keycode,
                state,
            } => {
                if !KeyboardHandler::key(self, time, keycode, state) {
                    let focus = self.keyboard_focus;
                    self.seat.send_key(focus, time, keycode, state);
                }
                self.seat.keyboard_layout_mut().update_key(keycode, state);
            }
            SeatEvent::Motion { time, location } => {
                PointerHandler::motion(self, time, location);
            }
            SeatEvent::Refocus => PointerHandler::focus(self),
        }
    }
}
