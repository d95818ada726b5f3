//! Tern - compositor orchestration core
//!
//! Brings the compositor's subsystems up in order, routes their events into
//! one [`Compositor`] state and tears everything down again in reverse.
//! Devices, rendering and the wire protocol sit behind the traits in
//! [`backend`] and [`protocol`].

pub mod backend;
pub mod binding;
pub mod compositor;
pub mod config;
pub mod error;
pub mod globals;
pub mod info;
pub mod input;
pub mod lifecycle;
pub mod logging;
pub mod output;
mod page_flip;
pub mod protocol;
mod repaint;
pub mod signal;
pub mod surface;
pub mod testing;
pub mod tracy;
pub mod utils;

pub use binding::{KeyBinding, Keysym, ModifierMask, Modifiers};
pub use compositor::Compositor;
pub use config::Config;
pub use error::{InitError, InitStage, NoMemory};
pub use info::CompositorInfo;
pub use lifecycle::initialize;
