//! Process-wide compositor state
//!
//! One [`Compositor`] exists per process. It is created by
//! [`crate::lifecycle::initialize`] and is the calloop data every event
//! callback receives.

use smithay::reexports::calloop::{LoopHandle, LoopSignal};
use smithay::utils::{Logical, Point};
use tracing::{debug, info, warn};

use crate::backend::{BufferAllocator, DeviceContext, Drm, Renderer, Seat, Tty, TtyEvent};
use crate::binding::{KeyBinding, KeyBindings};
use crate::lifecycle::{DisplayBinding, Stage};
use crate::output::{Output, OutputDevice, OutputId};
use crate::protocol::ProtocolDisplay;
use crate::signal::{ListenerAction, ListenerId, Signal};
use crate::surface::{Surface, SurfaceId, SurfaceList};

pub struct Compositor {
    pub(crate) loop_handle: LoopHandle<'static, Compositor>,
    pub(crate) loop_signal: LoopSignal,
    pub(crate) destroy_signal: Signal<Compositor>,
    pub(crate) key_bindings: KeyBindings,
    pub(crate) surfaces: SurfaceList,
    pub(crate) next_surface_id: u32,
    pub(crate) pointer_focus: Option<SurfaceId>,
    pub(crate) keyboard_focus: Option<SurfaceId>,
    pub(crate) pointer_location: Point<f64, Logical>,

    // Field ordering for Drop: fields drop in declaration order, which must
    // be the reverse of initialization order. The display goes last.
    pub(crate) outputs: Vec<Output>,
    pub(crate) renderer: Stage<dyn Renderer>,
    pub(crate) display_binding: DisplayBinding,
    pub(crate) allocator: Stage<dyn BufferAllocator>,
    pub(crate) drm: Stage<dyn Drm>,
    pub(crate) seat: Stage<dyn Seat>,
    pub(crate) tty: Stage<dyn Tty>,
    pub(crate) device_context: Stage<dyn DeviceContext>,
    pub(crate) display: Box<dyn ProtocolDisplay>,
}

impl Compositor {
    pub fn loop_handle(&self) -> &LoopHandle<'static, Compositor> {
        &self.loop_handle
    }

    /// Ask the event loop to return.
    pub fn stop(&self) {
        info!("Stopping event loop");
        self.loop_signal.stop();
    }

    pub fn outputs(&self) -> &[Output] {
        &self.outputs
    }

    pub fn output(&self, id: OutputId) -> Option<&Output> {
        self.outputs.iter().find(|output| output.id() == id)
    }

    pub(crate) fn output_mut(&mut self, id: OutputId) -> Option<&mut Output> {
        self.outputs.iter_mut().find(|output| output.id() == id)
    }

    /// Track an output that appeared after startup. It is repainted like any
    /// other but clients are not told about it. A device reusing the id of a
    /// known output is released and `None` is returned.
    pub fn add_output(&mut self, mut device: Box<dyn OutputDevice>) -> Option<OutputId> {
        if self.output(device.id()).is_some() {
            warn!("Rejecting {}: {} is already in use", device.name(), device.id());
            device.finish();
            return None;
        }

        let output = Output::new(device);
        let id = output.id();
        info!("Added {} ({})", output.name(), id);
        self.outputs.push(output);
        Some(id)
    }

    pub fn surfaces(&self) -> &SurfaceList {
        &self.surfaces
    }

    pub fn surface(&self, id: SurfaceId) -> Option<&Surface> {
        self.surfaces.get(id)
    }

    pub fn surface_mut(&mut self, id: SurfaceId) -> Option<&mut Surface> {
        self.surfaces.get_mut(id)
    }

    pub(crate) fn next_surface_id(&mut self) -> SurfaceId {
        let id = SurfaceId(self.next_surface_id);
        self.next_surface_id += 1;
        id
    }

    /// Remove a surface, dropping any focus it held.
    pub fn destroy_surface(&mut self, id: SurfaceId) -> Option<Surface> {
        let surface = self.surfaces.remove(id)?;
        debug!("Destroyed {}", id);

        if self.keyboard_focus == Some(id) {
            self.keyboard_focus = None;
        }
        if self.pointer_focus == Some(id) {
            self.pointer_focus = None;
            self.seat.set_pointer_focus(None);
        }
        Some(surface)
    }

    /// Schedule every output the surface is visible on.
    pub fn damage_surface(&mut self, id: SurfaceId) {
        let Some(geometry) = self.surfaces.get(id).map(|surface| surface.geometry()) else {
            return;
        };
        let damaged: Vec<OutputId> = self
            .outputs
            .iter()
            .filter(|output| output.geometry().overlaps(geometry))
            .map(|output| output.id())
            .collect();
        for output in damaged {
            self.schedule_repaint(output);
        }
    }

    pub fn key_bindings(&self) -> &KeyBindings {
        &self.key_bindings
    }

    /// Bindings added later lose to earlier ones with the same match.
    pub fn add_key_binding(&mut self, binding: KeyBinding) {
        debug!("Adding {:?}", binding);
        self.key_bindings.push(binding);
    }

    pub fn pointer_focus(&self) -> Option<SurfaceId> {
        self.pointer_focus
    }

    pub fn pointer_location(&self) -> Point<f64, Logical> {
        self.pointer_location
    }

    pub fn keyboard_focus(&self) -> Option<SurfaceId> {
        self.keyboard_focus
    }

    pub fn set_keyboard_focus(&mut self, focus: Option<SurfaceId>) {
        if let Some(id) = focus {
            if self.surfaces.get(id).is_none() {
                warn!("Ignoring keyboard focus on unknown {}", id);
                return;
            }
        }
        self.keyboard_focus = focus;
    }

    pub fn active_vt(&self) -> u32 {
        self.tty.active_vt()
    }

    /// Switch to `vt` unless it is already the active one.
    pub fn switch_vt(&mut self, vt: u32) {
        if vt == self.tty.active_vt() {
            return;
        }
        info!("Switching to VT {}", vt);
        if let Err(err) = self.tty.switch_vt(vt) {
            warn!("Could not switch to VT {}: {:#}", vt, err);
        }
    }

    pub fn handle_tty_event(&mut self, event: TtyEvent) {
        match event {
            TtyEvent::Enter => {
                info!("VT entered, resuming");
                if let Err(err) = self.drm.set_master() {
                    warn!("Could not become DRM master: {:#}", err);
                }
                self.schedule_repaint_all();
            }
            TtyEvent::Leave => {
                info!("VT left, pausing");
                if let Err(err) = self.drm.drop_master() {
                    warn!("Could not drop DRM master: {:#}", err);
                }
            }
        }
    }

    /// Run `listener` when the compositor is torn down, before any subsystem
    /// is released.
    pub fn on_destroy(
        &mut self,
        listener: impl FnMut(&Compositor) -> ListenerAction + 'static,
    ) -> ListenerId {
        self.destroy_signal.add(listener)
    }

    pub fn remove_destroy_listener(&mut self, id: ListenerId) -> bool {
        self.destroy_signal.remove(id)
    }
}

impl Drop for Compositor {
    fn drop(&mut self) {
        let mut destroy_signal = std::mem::take(&mut self.destroy_signal);
        debug!("Notifying {} destroy listeners", destroy_signal.len());
        destroy_signal.emit(self);
    }
}
