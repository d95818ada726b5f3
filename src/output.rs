//! Outputs and their double-buffer bookkeeping

use std::fmt;

use serde::Serialize;
use smithay::utils::{Logical, Rectangle};
use tracing::debug;

use crate::protocol::ProtocolDisplay;

/// Identifies an output across device events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct OutputId(pub u32);

impl fmt::Display for OutputId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "output#{}", self.0)
    }
}

/// Device side of an output, created by [`crate::backend::Drm::create_outputs`].
pub trait OutputDevice {
    fn id(&self) -> OutputId;

    fn name(&self) -> &str;

    fn geometry(&self) -> Rectangle<i32, Logical>;

    /// Queue a page flip to `buffer`. Completion arrives as a device event.
    fn switch_buffer(&mut self, buffer: usize) -> anyhow::Result<()>;

    fn add_globals(&mut self, display: &mut dyn ProtocolDisplay);

    fn finish(&mut self);
}

pub struct Output {
    /// True from the moment a repaint is queued until its page flip completes.
    pub(crate) repaint_scheduled: bool,
    front_buffer: usize,
    device: Box<dyn OutputDevice>,
}

impl fmt::Debug for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Output")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("repaint_scheduled", &self.repaint_scheduled)
            .field("front_buffer", &self.front_buffer)
            .finish()
    }
}

impl Output {
    pub fn new(device: Box<dyn OutputDevice>) -> Self {
        Self {
            repaint_scheduled: false,
            front_buffer: 0,
            device,
        }
    }

    pub fn id(&self) -> OutputId {
        self.device.id()
    }

    pub fn name(&self) -> &str {
        self.device.name()
    }

    pub fn geometry(&self) -> Rectangle<i32, Logical> {
        self.device.geometry()
    }

    pub fn repaint_scheduled(&self) -> bool {
        self.repaint_scheduled
    }

    pub fn front_buffer(&self) -> usize {
        self.front_buffer
    }

    /// The buffer the renderer draws into.
    pub fn back_buffer(&self) -> usize {
        self.front_buffer ^ 1
    }

    pub(crate) fn switch_buffer(&mut self) -> anyhow::Result<()> {
        let back = self.back_buffer();
        self.device.switch_buffer(back)
    }

    /// Bookkeeping for a completed flip: re-arm scheduling and swap buffers.
    pub(crate) fn page_flipped(&mut self) {
        self.repaint_scheduled = false;
        self.front_buffer ^= 1;
    }

    pub(crate) fn add_globals(&mut self, display: &mut dyn ProtocolDisplay) {
        self.device.add_globals(display);
    }
}

impl Drop for Output {
    fn drop(&mut self) {
        debug!("Releasing output {} ({})", self.device.name(), self.device.id());
        self.device.finish();
    }
}
