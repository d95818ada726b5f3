//! Headless platform
//!
//! In-process implementations of every collaborator, so the compositor can
//! run without DRM, GPU or TTY access. Everything the collaborators observe
//! is recorded in a shared [`HeadlessState`] for assertions.
//!
//! # Design Invariants
//!
//! 1. **No hardware access**: nothing here opens a device node.
//!
//! 2. **Deterministic outputs**: virtual outputs have the sizes and refresh
//!    rates from [`Config::outputs`] and are laid out left to right.
//!
//! 3. **Event simulation**: the senders handed to the platform are kept, so
//!    input, VT changes and page flips can be injected from outside.
//!
//! 4. **Ordered ledger**: every acquisition and release is appended to
//!    [`HeadlessState::ledger`], which is how teardown order is verified.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use anyhow::{anyhow, bail};
use smithay::reexports::calloop::{
    channel::Sender,
    timer::{TimeoutAction, Timer},
    LoopHandle, RegistrationToken,
};
use smithay::utils::{Logical, Point, Rectangle, Size};
use tracing::{debug, info, trace};

use super::{
    BufferAllocator, DeviceContext, Drm, DrmEvent, Platform, RenderContext, Renderer, Seat,
    SeatEvent, Subsystem, Tty, TtyEvent,
};
use crate::compositor::Compositor;
use crate::config::{Config, OutputConfig};
use crate::error::{InitStage, NoMemory};
use crate::input::{KeyState, KeyboardLayout, XkbLayout};
use crate::output::{Output, OutputDevice, OutputId};
use crate::protocol::{BufferId, ClientId, GlobalKind, ObjectId, ProtocolDisplay, SurfaceResource};
use crate::surface::{SurfaceId, SurfaceList};

pub const SEAT_VERSION: u32 = 4;
pub const OUTPUT_VERSION: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerEntry {
    Acquired(InitStage),
    Released(InitStage),
    OutputReleased(OutputId),
}

/// Events sent on a surface object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceEvent {
    FrameDone { callback: ObjectId, time: u32 },
    BufferRelease(BufferId),
}

#[derive(Debug, Default)]
pub struct HeadlessState {
    pub ledger: Vec<LedgerEntry>,
    pub renders: HashMap<OutputId, usize>,
    /// Flip requests as (output, target buffer).
    pub flips: Vec<(OutputId, usize)>,
    pub master: bool,
    pub active_vt: u32,
    pub vt_switches: Vec<u32>,
    /// Keys delivered to clients as (focus, keycode, state).
    pub keys: Vec<(Option<SurfaceId>, u32, KeyState)>,
    pub pointer_focus: Vec<Option<SurfaceId>>,
    pub globals: Vec<(GlobalKind, u32)>,
    pub surface_events: Vec<(ObjectId, SurfaceEvent)>,
    pub display_bound: bool,
    /// Vblank timers registered on the loop and not yet fired or removed.
    pub armed_timers: usize,
    /// Make the renderer fail every repaint.
    pub fail_render: bool,
    /// Make surface and region construction run out of memory.
    pub fail_allocation: bool,
}

impl HeadlessState {
    pub fn render_count(&self, output: OutputId) -> usize {
        self.renders.get(&output).copied().unwrap_or(0)
    }

    pub fn flip_count(&self, output: OutputId) -> usize {
        self.flips.iter().filter(|(id, _)| *id == output).count()
    }

    pub fn acquired(&self) -> Vec<InitStage> {
        self.ledger
            .iter()
            .filter_map(|entry| match entry {
                LedgerEntry::Acquired(stage) => Some(*stage),
                _ => None,
            })
            .collect()
    }

    /// Release entries in the order they happened.
    pub fn released(&self) -> Vec<LedgerEntry> {
        self.ledger
            .iter()
            .filter(|entry| !matches!(entry, LedgerEntry::Acquired(_)))
            .copied()
            .collect()
    }

    pub fn surface_events(&self, object: ObjectId) -> Vec<SurfaceEvent> {
        self.surface_events
            .iter()
            .filter(|(id, _)| *id == object)
            .map(|(_, event)| *event)
            .collect()
    }

    fn record(&mut self, entry: LedgerEntry) {
        debug!("Headless ledger: {:?}", entry);
        self.ledger.push(entry);
    }
}

pub type SharedState = Rc<RefCell<HeadlessState>>;

/// Creates headless subsystems, optionally failing at one stage.
pub struct HeadlessPlatform {
    config: Config,
    state: SharedState,
    fail_at: Option<InitStage>,
    layout: Option<Box<dyn KeyboardLayout>>,
    manual_vblank: bool,
    tty_events: Option<Sender<TtyEvent>>,
    seat_events: Option<Sender<SeatEvent>>,
    drm_events: Option<Sender<DrmEvent>>,
}

impl HeadlessPlatform {
    pub fn new(config: Config) -> Self {
        let state = HeadlessState {
            master: true,
            active_vt: config.vt.unwrap_or(1),
            ..Default::default()
        };
        Self {
            config,
            state: Rc::new(RefCell::new(state)),
            fail_at: None,
            layout: None,
            manual_vblank: false,
            tty_events: None,
            seat_events: None,
            drm_events: None,
        }
    }

    /// Make the given stage fail to initialize.
    pub fn fail_at(mut self, stage: InitStage) -> Self {
        self.fail_at = Some(stage);
        self
    }

    /// Use `layout` instead of compiling the configured xkb keymap.
    pub fn with_layout(mut self, layout: impl KeyboardLayout + 'static) -> Self {
        self.layout = Some(Box::new(layout));
        self
    }

    /// Complete page flips only through [`Self::complete_page_flip`].
    pub fn manual_vblank(mut self) -> Self {
        self.manual_vblank = true;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> SharedState {
        self.state.clone()
    }

    /// Protocol display sharing this platform's state.
    pub fn display(&self) -> HeadlessDisplay {
        HeadlessDisplay {
            state: self.state.clone(),
        }
    }

    pub fn send_tty_event(&self, event: TtyEvent) -> anyhow::Result<()> {
        let sender = self.tty_events.as_ref().ok_or_else(|| anyhow!("no tty"))?;
        sender.send(event)?;
        Ok(())
    }

    pub fn send_seat_event(&self, event: SeatEvent) -> anyhow::Result<()> {
        let sender = self.seat_events.as_ref().ok_or_else(|| anyhow!("no seat"))?;
        sender.send(event)?;
        Ok(())
    }

    pub fn complete_page_flip(&self, output: OutputId) -> anyhow::Result<()> {
        let sender = self.drm_events.as_ref().ok_or_else(|| anyhow!("no drm device"))?;
        sender.send(DrmEvent::PageFlip { output })?;
        Ok(())
    }

    fn acquire(&self, stage: InitStage) -> anyhow::Result<()> {
        if self.fail_at == Some(stage) {
            bail!("injected {} failure", stage);
        }
        self.state.borrow_mut().record(LedgerEntry::Acquired(stage));
        Ok(())
    }
}

impl Platform for HeadlessPlatform {
    fn device_context(&mut self) -> anyhow::Result<Box<dyn DeviceContext>> {
        self.acquire(InitStage::DeviceContext)?;
        Ok(Box::new(HeadlessDeviceContext {
            state: self.state.clone(),
        }))
    }

    fn tty(
        &mut self,
        _context: &dyn DeviceContext,
        _handle: &LoopHandle<'static, Compositor>,
        vt: Option<u32>,
        events: Sender<TtyEvent>,
    ) -> anyhow::Result<Box<dyn Tty>> {
        self.acquire(InitStage::Tty)?;
        let vt = vt.unwrap_or(self.state.borrow().active_vt);
        self.state.borrow_mut().active_vt = vt;
        info!("Headless tty on VT {}", vt);

        self.tty_events = Some(events.clone());
        Ok(Box::new(HeadlessTty {
            state: self.state.clone(),
            own_vt: vt,
            events,
        }))
    }

    fn seat(
        &mut self,
        _context: &dyn DeviceContext,
        seat_id: &str,
        events: Sender<SeatEvent>,
    ) -> anyhow::Result<Box<dyn Seat>> {
        let layout = match self.layout.take() {
            Some(layout) => layout,
            None => Box::new(XkbLayout::new(&self.config.xkb)?),
        };
        self.acquire(InitStage::Seat)?;
        info!("Headless seat {}", seat_id);

        self.seat_events = Some(events);
        Ok(Box::new(HeadlessSeat {
            state: self.state.clone(),
            layout,
        }))
    }

    fn drm(
        &mut self,
        _context: &dyn DeviceContext,
        _seat_id: &str,
        events: Sender<DrmEvent>,
    ) -> anyhow::Result<Box<dyn Drm>> {
        self.acquire(InitStage::Drm)?;

        self.drm_events = Some(events.clone());
        Ok(Box::new(HeadlessDrm {
            state: self.state.clone(),
            events,
            outputs: self.config.outputs.clone(),
            handle: None,
            manual_vblank: self.manual_vblank,
            fail_outputs: self.fail_at == Some(InitStage::Outputs),
        }))
    }

    fn allocator(&mut self, _drm: &dyn Drm) -> anyhow::Result<Box<dyn BufferAllocator>> {
        self.acquire(InitStage::Allocator)?;
        Ok(Box::new(HeadlessAllocator {
            state: self.state.clone(),
        }))
    }

    fn render_context(
        &mut self,
        _allocator: &dyn BufferAllocator,
    ) -> anyhow::Result<Box<dyn RenderContext>> {
        self.acquire(InitStage::RenderContext)?;
        Ok(Box::new(HeadlessRenderContext {
            state: self.state.clone(),
            fail_bind: self.fail_at == Some(InitStage::DisplayBinding),
        }))
    }

    fn renderer(
        &mut self,
        _drm: &dyn Drm,
        _allocator: &dyn BufferAllocator,
    ) -> anyhow::Result<Box<dyn Renderer>> {
        self.acquire(InitStage::Renderer)?;
        Ok(Box::new(HeadlessRenderer {
            state: self.state.clone(),
        }))
    }
}

struct HeadlessDeviceContext {
    state: SharedState,
}

impl Subsystem for HeadlessDeviceContext {
    fn finish(&mut self) {
        self.state
            .borrow_mut()
            .record(LedgerEntry::Released(InitStage::DeviceContext));
    }
}

impl DeviceContext for HeadlessDeviceContext {}

/// Switching away sends `Leave`, switching back sends `Enter`.
struct HeadlessTty {
    state: SharedState,
    own_vt: u32,
    events: Sender<TtyEvent>,
}

impl Subsystem for HeadlessTty {
    fn finish(&mut self) {
        self.state
            .borrow_mut()
            .record(LedgerEntry::Released(InitStage::Tty));
    }
}

impl Tty for HeadlessTty {
    fn active_vt(&self) -> u32 {
        self.state.borrow().active_vt
    }

    fn switch_vt(&mut self, vt: u32) -> anyhow::Result<()> {
        let previous = {
            let mut state = self.state.borrow_mut();
            state.vt_switches.push(vt);
            std::mem::replace(&mut state.active_vt, vt)
        };

        if previous == self.own_vt && vt != self.own_vt {
            self.events.send(TtyEvent::Leave)?;
        } else if previous != self.own_vt && vt == self.own_vt {
            self.events.send(TtyEvent::Enter)?;
        }
        Ok(())
    }
}

struct HeadlessSeat {
    state: SharedState,
    layout: Box<dyn KeyboardLayout>,
}

impl Subsystem for HeadlessSeat {
    fn finish(&mut self) {
        self.state
            .borrow_mut()
            .record(LedgerEntry::Released(InitStage::Seat));
    }
}

impl Seat for HeadlessSeat {
    fn add_event_sources(
        &mut self,
        _handle: &LoopHandle<'static, Compositor>,
    ) -> anyhow::Result<()> {
        // Input arrives only through the injected seat channel.
        Ok(())
    }

    fn keyboard_layout(&self) -> &dyn KeyboardLayout {
        &*self.layout
    }

    fn keyboard_layout_mut(&mut self) -> &mut dyn KeyboardLayout {
        &mut *self.layout
    }

    fn send_key(&mut self, focus: Option<SurfaceId>, _time: u32, keycode: u32, state: KeyState) {
        self.state.borrow_mut().keys.push((focus, keycode, state));
    }

    fn set_pointer_focus(&mut self, focus: Option<SurfaceId>) {
        self.state.borrow_mut().pointer_focus.push(focus);
    }

    fn add_globals(&mut self, display: &mut dyn ProtocolDisplay) {
        display.create_global(GlobalKind::Seat, SEAT_VERSION);
    }
}

struct HeadlessDrm {
    state: SharedState,
    events: Sender<DrmEvent>,
    outputs: Vec<OutputConfig>,
    handle: Option<LoopHandle<'static, Compositor>>,
    manual_vblank: bool,
    fail_outputs: bool,
}

impl Subsystem for HeadlessDrm {
    fn finish(&mut self) {
        self.state
            .borrow_mut()
            .record(LedgerEntry::Released(InitStage::Drm));
    }
}

impl Drm for HeadlessDrm {
    fn set_master(&mut self) -> anyhow::Result<()> {
        self.state.borrow_mut().master = true;
        Ok(())
    }

    fn drop_master(&mut self) -> anyhow::Result<()> {
        self.state.borrow_mut().master = false;
        Ok(())
    }

    fn add_event_sources(
        &mut self,
        handle: &LoopHandle<'static, Compositor>,
    ) -> anyhow::Result<()> {
        if !self.manual_vblank {
            self.handle = Some(handle.clone());
        }
        Ok(())
    }

    fn create_outputs(&mut self) -> anyhow::Result<Vec<Box<dyn OutputDevice>>> {
        if self.fail_outputs {
            bail!("injected {} failure", InitStage::Outputs);
        }

        let mut x = 0;
        let mut devices: Vec<Box<dyn OutputDevice>> = Vec::with_capacity(self.outputs.len());
        for (index, config) in self.outputs.iter().enumerate() {
            let geometry = Rectangle::new(
                Point::from((x, 0)),
                Size::from((config.width, config.height)),
            );
            x += config.width;

            let vblank = self
                .handle
                .as_ref()
                .map(|handle| (handle.clone(), self.events.clone()));
            devices.push(Box::new(HeadlessOutput {
                id: OutputId(index as u32),
                name: config.name.clone(),
                geometry,
                refresh: config.refresh_interval(),
                state: self.state.clone(),
                vblank,
                timers: Vec::new(),
            }));
            info!(
                "Virtual output {} ({}x{}) at ({}, {})",
                config.name, config.width, config.height, geometry.loc.x, geometry.loc.y
            );
        }

        self.state
            .borrow_mut()
            .record(LedgerEntry::Acquired(InitStage::Outputs));
        Ok(devices)
    }
}

struct HeadlessOutput {
    id: OutputId,
    name: String,
    geometry: Rectangle<i32, Logical>,
    refresh: Duration,
    state: SharedState,
    /// Set unless flips are completed by hand.
    vblank: Option<(LoopHandle<'static, Compositor>, Sender<DrmEvent>)>,
    /// Armed vblank timers with their fired flag.
    timers: Vec<(RegistrationToken, Rc<Cell<bool>>)>,
}

impl OutputDevice for HeadlessOutput {
    fn id(&self) -> OutputId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn geometry(&self) -> Rectangle<i32, Logical> {
        self.geometry
    }

    fn switch_buffer(&mut self, buffer: usize) -> anyhow::Result<()> {
        {
            let mut state = self.state.borrow_mut();
            if !state.master {
                bail!("not DRM master");
            }
            state.flips.push((self.id, buffer));
        }
        trace!("{}: flip to buffer {} queued", self.name, buffer);

        if let Some((handle, events)) = &self.vblank {
            self.timers.retain(|(_, fired)| !fired.get());

            let events = events.clone();
            let output = self.id;
            let fired = Rc::new(Cell::new(false));
            let flag = fired.clone();
            let state = self.state.clone();
            let token = handle
                .insert_source(Timer::from_duration(self.refresh), move |_, _, _| {
                    flag.set(true);
                    state.borrow_mut().armed_timers -= 1;
                    // The receiver is gone once the device is released.
                    let _ = events.send(DrmEvent::PageFlip { output });
                    TimeoutAction::Drop
                })
                .map_err(|err| anyhow!("could not arm vblank timer: {}", err.error))?;
            self.timers.push((token, fired));
            self.state.borrow_mut().armed_timers += 1;
        }
        Ok(())
    }

    fn add_globals(&mut self, display: &mut dyn ProtocolDisplay) {
        display.create_global(GlobalKind::Output(self.id), OUTPUT_VERSION);
    }

    fn finish(&mut self) {
        if let Some((handle, _)) = &self.vblank {
            let mut state = self.state.borrow_mut();
            for (token, fired) in self.timers.drain(..) {
                if !fired.get() {
                    handle.remove(token);
                    state.armed_timers -= 1;
                }
            }
        }
        self.state
            .borrow_mut()
            .record(LedgerEntry::OutputReleased(self.id));
    }
}

struct HeadlessAllocator {
    state: SharedState,
}

impl Subsystem for HeadlessAllocator {
    fn finish(&mut self) {
        self.state
            .borrow_mut()
            .record(LedgerEntry::Released(InitStage::Allocator));
    }
}

impl BufferAllocator for HeadlessAllocator {}

struct HeadlessRenderContext {
    state: SharedState,
    fail_bind: bool,
}

impl Subsystem for HeadlessRenderContext {
    fn finish(&mut self) {
        self.state
            .borrow_mut()
            .record(LedgerEntry::Released(InitStage::RenderContext));
    }
}

impl RenderContext for HeadlessRenderContext {
    fn bind_display(&mut self, _display: &mut dyn ProtocolDisplay) -> anyhow::Result<()> {
        if self.fail_bind {
            bail!("injected {} failure", InitStage::DisplayBinding);
        }
        let mut state = self.state.borrow_mut();
        state.display_bound = true;
        state.record(LedgerEntry::Acquired(InitStage::DisplayBinding));
        Ok(())
    }

    fn unbind_display(&mut self) {
        let mut state = self.state.borrow_mut();
        state.display_bound = false;
        state.record(LedgerEntry::Released(InitStage::DisplayBinding));
    }
}

/// Counts repaints instead of drawing.
struct HeadlessRenderer {
    state: SharedState,
}

impl Subsystem for HeadlessRenderer {
    fn finish(&mut self) {
        self.state
            .borrow_mut()
            .record(LedgerEntry::Released(InitStage::Renderer));
    }
}

impl Renderer for HeadlessRenderer {
    fn repaint_output(&mut self, output: &Output, surfaces: &SurfaceList) -> anyhow::Result<()> {
        let mut state = self.state.borrow_mut();
        if state.fail_render {
            bail!("render failure on {}", output.name());
        }
        let count = state.renders.entry(output.id()).or_default();
        *count += 1;
        debug!(
            "Headless render #{} for output {} ({} surfaces, buffer {})",
            count,
            output.name(),
            surfaces.len(),
            output.back_buffer()
        );
        Ok(())
    }
}

pub struct HeadlessDisplay {
    state: SharedState,
}

impl ProtocolDisplay for HeadlessDisplay {
    fn create_global(&mut self, kind: GlobalKind, version: u32) {
        debug!("Global {:?} v{}", kind, version);
        self.state.borrow_mut().globals.push((kind, version));
    }

    fn create_surface(
        &mut self,
        _client: ClientId,
        id: ObjectId,
    ) -> Result<Box<dyn SurfaceResource>, NoMemory> {
        if self.state.borrow().fail_allocation {
            return Err(NoMemory);
        }
        Ok(Box::new(HeadlessSurface {
            object: id,
            state: self.state.clone(),
        }))
    }

    fn create_region(&mut self, _client: ClientId, _id: ObjectId) -> Result<(), NoMemory> {
        if self.state.borrow().fail_allocation {
            return Err(NoMemory);
        }
        Ok(())
    }
}

struct HeadlessSurface {
    object: ObjectId,
    state: SharedState,
}

impl SurfaceResource for HeadlessSurface {
    fn send_frame_done(&mut self, callback: ObjectId, time: u32) {
        self.state
            .borrow_mut()
            .surface_events
            .push((self.object, SurfaceEvent::FrameDone { callback, time }));
    }

    fn send_buffer_release(&mut self, buffer: BufferId) {
        self.state
            .borrow_mut()
            .surface_events
            .push((self.object, SurfaceEvent::BufferRelease(buffer)));
    }
}
