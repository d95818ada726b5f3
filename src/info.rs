//! Serializable snapshot of compositor state
//!
//! Logged by the binary after startup and used by tests to assert on state
//! without reaching into the compositor.

use serde::Serialize;

use crate::compositor::Compositor;
use crate::output::{Output, OutputId};
use crate::protocol::ClientId;
use crate::surface::{Surface, SurfaceId};

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct OutputInfo {
    pub id: OutputId,
    pub name: String,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub repaint_scheduled: bool,
    pub front_buffer: usize,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct SurfaceInfo {
    pub id: SurfaceId,
    pub client: ClientId,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub has_buffer: bool,
    pub pending_frame_callbacks: usize,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct CompositorInfo {
    pub outputs: Vec<OutputInfo>,
    /// Stacking order, front first.
    pub surfaces: Vec<SurfaceInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pointer_focus: Option<SurfaceId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyboard_focus: Option<SurfaceId>,
    pub pointer: (f64, f64),
    pub key_bindings: usize,
}

impl From<&Output> for OutputInfo {
    fn from(output: &Output) -> Self {
        let geometry = output.geometry();
        Self {
            id: output.id(),
            name: output.name().to_string(),
            x: geometry.loc.x,
            y: geometry.loc.y,
            width: geometry.size.w,
            height: geometry.size.h,
            repaint_scheduled: output.repaint_scheduled(),
            front_buffer: output.front_buffer(),
        }
    }
}

impl From<&Surface> for SurfaceInfo {
    fn from(surface: &Surface) -> Self {
        let geometry = surface.geometry();
        Self {
            id: surface.id(),
            client: surface.client(),
            x: geometry.loc.x,
            y: geometry.loc.y,
            width: geometry.size.w,
            height: geometry.size.h,
            has_buffer: surface.buffer().is_some(),
            pending_frame_callbacks: surface.pending_frame_callbacks().len(),
        }
    }
}

impl Compositor {
    pub fn info(&self) -> CompositorInfo {
        let pointer = self.pointer_location();
        CompositorInfo {
            outputs: self.outputs().iter().map(OutputInfo::from).collect(),
            surfaces: self.surfaces().iter().map(SurfaceInfo::from).collect(),
            pointer_focus: self.pointer_focus(),
            keyboard_focus: self.keyboard_focus(),
            pointer: (pointer.x, pointer.y),
            key_bindings: self.key_bindings().len(),
        }
    }
}
