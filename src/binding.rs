//! Global key bindings
//!
//! Bindings are matched in registration order and the first match wins.
//! The collection is append-only for the lifetime of the compositor.

use std::fmt;
use std::rc::Rc;

use bitflags::bitflags;

use crate::compositor::Compositor;

/// Layout-resolved key symbol (an xkb keysym value).
pub type Keysym = u32;

bitflags! {
    /// Canonical modifiers considered for shortcut matching.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u32 {
        const CTRL = 1 << 0;
        const ALT = 1 << 1;
        const LOGO = 1 << 2;
        const SHIFT = 1 << 3;
    }
}

/// Modifiers a binding requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifierMask {
    /// Matches whatever modifiers are held.
    Any,
    /// Matches only this exact set.
    Exact(Modifiers),
}

impl ModifierMask {
    pub fn matches(self, modifiers: Modifiers) -> bool {
        match self {
            ModifierMask::Any => true,
            ModifierMask::Exact(required) => required == modifiers,
        }
    }
}

impl From<Modifiers> for ModifierMask {
    fn from(modifiers: Modifiers) -> Self {
        ModifierMask::Exact(modifiers)
    }
}

/// Called with the compositor, the event time and the matched keysym.
pub type BindingHandler = Rc<dyn Fn(&mut Compositor, u32, Keysym)>;

#[derive(Clone)]
pub struct KeyBinding {
    keysym: Keysym,
    modifiers: ModifierMask,
    handler: BindingHandler,
}

impl KeyBinding {
    pub fn new(
        modifiers: impl Into<ModifierMask>,
        keysym: Keysym,
        handler: impl Fn(&mut Compositor, u32, Keysym) + 'static,
    ) -> Self {
        Self {
            keysym,
            modifiers: modifiers.into(),
            handler: Rc::new(handler),
        }
    }

    pub fn keysym(&self) -> Keysym {
        self.keysym
    }

    pub fn modifiers(&self) -> ModifierMask {
        self.modifiers
    }

    pub fn handler(&self) -> BindingHandler {
        self.handler.clone()
    }

    pub fn matches(&self, keysym: Keysym, modifiers: Modifiers) -> bool {
        self.keysym == keysym && self.modifiers.matches(modifiers)
    }
}

impl fmt::Debug for KeyBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyBinding")
            .field("keysym", &format_args!("{:#x}", self.keysym))
            .field("modifiers", &self.modifiers)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
pub struct KeyBindings {
    bindings: Vec<KeyBinding>,
}

impl KeyBindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, binding: KeyBinding) {
        self.bindings.push(binding);
    }

    /// First binding matching `keysym` under `modifiers`.
    pub fn find(&self, keysym: Keysym, modifiers: Modifiers) -> Option<&KeyBinding> {
        self.bindings
            .iter()
            .find(|binding| binding.matches(keysym, modifiers))
    }

    pub fn iter(&self) -> impl Iterator<Item = &KeyBinding> {
        self.bindings.iter()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
