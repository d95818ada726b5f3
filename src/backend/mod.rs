//! Collaborator interfaces
//!
//! The compositor core drives hardware through these traits and never
//! touches devices directly:
//!
//! - **Headless platform** (`headless`): in-process implementations with
//!   virtual outputs and an injectable input channel. Used by the `tern`
//!   binary and by the test fixture.
//!
//! # Design Invariants
//!
//! 1. **Explicit release**: every subsystem is released through
//!    [`Subsystem::finish`], called exactly once by the lifecycle guards.
//!    Implementations must not rely on `Drop` for device cleanup.
//!
//! 2. **Events through channels**: subsystems publish their events on the
//!    calloop [`Sender`] handed to them at construction. The lifecycle owns
//!    the receiving end and routes events into the compositor, so no
//!    subsystem ever holds a reference to the compositor.
//!
//! 3. **Single thread**: all trait methods run on the event-loop thread.

pub mod headless;

pub use headless::HeadlessPlatform;

use smithay::reexports::calloop::{channel::Sender, LoopHandle};
use smithay::utils::{Logical, Point};

use crate::compositor::Compositor;
use crate::input::{KeyState, KeyboardLayout};
use crate::output::{Output, OutputDevice, OutputId};
use crate::protocol::ProtocolDisplay;
use crate::surface::{SurfaceId, SurfaceList};

/// Virtual-terminal notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtyEvent {
    /// Our VT became the foreground VT.
    Enter,
    /// Another VT took the foreground.
    Leave,
}

/// Input notifications from the seat.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeatEvent {
    /// `keycode` is an evdev code.
    Key {
        time: u32,
        keycode: u32,
        state: KeyState,
    },
    /// Absolute pointer position in global coordinates.
    Motion {
        time: u32,
        location: Point<f64, Logical>,
    },
    /// Recompute pointer focus without moving the pointer.
    Refocus,
}

/// Display device notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrmEvent {
    PageFlip { output: OutputId },
}

pub trait Subsystem {
    /// Release everything the subsystem acquired.
    fn finish(&mut self);
}

/// Device enumeration context (udev or equivalent).
pub trait DeviceContext: Subsystem {}

pub trait Tty: Subsystem {
    fn active_vt(&self) -> u32;

    fn switch_vt(&mut self, vt: u32) -> anyhow::Result<()>;
}

pub trait Seat: Subsystem {
    fn add_event_sources(&mut self, handle: &LoopHandle<'static, Compositor>)
        -> anyhow::Result<()>;

    fn keyboard_layout(&self) -> &dyn KeyboardLayout;

    fn keyboard_layout_mut(&mut self) -> &mut dyn KeyboardLayout;

    /// Deliver a key the compositor did not consume to the focused client.
    fn send_key(&mut self, focus: Option<SurfaceId>, time: u32, keycode: u32, state: KeyState);

    /// Pointer focus changed; the seat sends enter/leave.
    fn set_pointer_focus(&mut self, focus: Option<SurfaceId>);

    fn add_globals(&mut self, display: &mut dyn ProtocolDisplay);
}

pub trait Drm: Subsystem {
    fn set_master(&mut self) -> anyhow::Result<()>;

    fn drop_master(&mut self) -> anyhow::Result<()>;

    fn add_event_sources(&mut self, handle: &LoopHandle<'static, Compositor>)
        -> anyhow::Result<()>;

    /// Enumerate connected outputs.
    fn create_outputs(&mut self) -> anyhow::Result<Vec<Box<dyn OutputDevice>>>;
}

/// Scanout buffer allocation device (GBM or equivalent).
pub trait BufferAllocator: Subsystem {}

pub trait RenderContext: Subsystem {
    /// Let clients share buffers with the render context.
    fn bind_display(&mut self, display: &mut dyn ProtocolDisplay) -> anyhow::Result<()>;

    fn unbind_display(&mut self);
}

pub trait Renderer: Subsystem {
    /// Compose `surfaces` into the back buffer of `output`.
    fn repaint_output(&mut self, output: &Output, surfaces: &SurfaceList) -> anyhow::Result<()>;
}

/// Creates each subsystem. Arguments name what a stage depends on.
pub trait Platform {
    fn device_context(&mut self) -> anyhow::Result<Box<dyn DeviceContext>>;

    fn tty(
        &mut self,
        context: &dyn DeviceContext,
        handle: &LoopHandle<'static, Compositor>,
        vt: Option<u32>,
        events: Sender<TtyEvent>,
    ) -> anyhow::Result<Box<dyn Tty>>;

    fn seat(
        &mut self,
        context: &dyn DeviceContext,
        seat_id: &str,
        events: Sender<SeatEvent>,
    ) -> anyhow::Result<Box<dyn Seat>>;

    fn drm(
        &mut self,
        context: &dyn DeviceContext,
        seat_id: &str,
        events: Sender<DrmEvent>,
    ) -> anyhow::Result<Box<dyn Drm>>;

    fn allocator(&mut self, drm: &dyn Drm) -> anyhow::Result<Box<dyn BufferAllocator>>;

    fn render_context(
        &mut self,
        allocator: &dyn BufferAllocator,
    ) -> anyhow::Result<Box<dyn RenderContext>>;

    fn renderer(
        &mut self,
        drm: &dyn Drm,
        allocator: &dyn BufferAllocator,
    ) -> anyhow::Result<Box<dyn Renderer>>;
}
