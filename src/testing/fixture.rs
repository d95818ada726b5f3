//! Test fixture for integration testing
//!
//! The Fixture runs a complete compositor on the headless platform: the same
//! `initialize` path as production, an event loop the test drives one
//! iteration at a time, and injectors for input, VT and page-flip events.

use std::cell::{Cell, Ref, RefMut};
use std::rc::Rc;
use std::time::Duration;

use smithay::reexports::calloop::{
    timer::{TimeoutAction, Timer},
    EventLoop,
};
use smithay::utils::{Logical, Point, Rectangle};
use tracing::info;

use crate::backend::headless::{HeadlessPlatform, HeadlessState, SharedState};
use crate::backend::{SeatEvent, TtyEvent};
use crate::compositor::Compositor;
use crate::config::Config;
use crate::globals::CompositorResource;
use crate::input::KeyState;
use crate::lifecycle::initialize;
use crate::logging::init_test_logging;
use crate::output::OutputId;
use crate::protocol::{ClientId, ObjectId};
use crate::surface::SurfaceId;

use super::client::TestClient;
use super::layout::TestLayout;

/// Compositor plus the platform it runs on.
///
/// Field order matters: the compositor removes its event sources from the
/// loop when dropped, so it must go before the event loop.
pub struct Fixture {
    compositor: Option<Compositor>,
    platform: HeadlessPlatform,
    event_loop: EventLoop<'static, Compositor>,
    state: SharedState,
    client: TestClient,
    compositor_resource: CompositorResource,
    time: u32,
}

impl Fixture {
    /// One 1920x1080 output, the test keymap and hand-driven page flips.
    pub fn new() -> anyhow::Result<Self> {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> anyhow::Result<Self> {
        let platform = HeadlessPlatform::new(config)
            .with_layout(TestLayout::new())
            .manual_vblank();
        Self::with_platform(platform)
    }

    /// Initialize on `platform`. An [`crate::error::InitError`] can be
    /// recovered with `downcast_ref`.
    pub fn with_platform(mut platform: HeadlessPlatform) -> anyhow::Result<Self> {
        init_test_logging();

        let event_loop: EventLoop<Compositor> = EventLoop::try_new()?;
        let config = platform.config().clone();
        let display = Box::new(platform.display());
        let mut compositor = initialize(&event_loop, display, &mut platform, &config)?;
        compositor.add_globals();

        let mut client = TestClient::new(ClientId(1));
        let object = client.new_object();
        let compositor_resource = compositor.bind_compositor(ClientId(1), 3, object);

        info!("Test fixture initialized with headless platform");

        Ok(Self {
            compositor: Some(compositor),
            state: platform.state(),
            platform,
            event_loop,
            client,
            compositor_resource,
            time: 0,
        })
    }

    pub fn compositor(&self) -> &Compositor {
        self.compositor.as_ref().expect("compositor finished")
    }

    pub fn compositor_mut(&mut self) -> &mut Compositor {
        self.compositor.as_mut().expect("compositor finished")
    }

    pub fn platform(&self) -> &HeadlessPlatform {
        &self.platform
    }

    pub fn state(&self) -> Ref<'_, HeadlessState> {
        self.state.borrow()
    }

    /// Toggle failure injection on the running platform.
    pub fn state_mut(&self) -> RefMut<'_, HeadlessState> {
        self.state.borrow_mut()
    }

    pub fn client(&self) -> &TestClient {
        &self.client
    }

    /// Run one loop iteration without blocking.
    pub fn dispatch(&mut self) {
        self.dispatch_for(Duration::ZERO);
    }

    /// Run one loop iteration, waiting up to `timeout` for events.
    pub fn dispatch_for(&mut self, timeout: Duration) {
        let compositor = self.compositor.as_mut().expect("compositor finished");
        self.event_loop
            .dispatch(Some(timeout), compositor)
            .expect("dispatch failed");
    }

    /// Run the loop until the compositor stops it. Returns false if it was
    /// still running after `timeout`.
    pub fn run_until_stopped(&mut self, timeout: Duration) -> bool {
        let timed_out = Rc::new(Cell::new(false));
        let flag = timed_out.clone();
        let token = self
            .event_loop
            .handle()
            .insert_source(Timer::from_duration(timeout), move |_, _, compositor| {
                flag.set(true);
                compositor.stop();
                TimeoutAction::Drop
            })
            .expect("could not insert timeout");

        let compositor = self.compositor.as_mut().expect("compositor finished");
        self.event_loop
            .run(Some(Duration::from_millis(5)), compositor, |_| {})
            .expect("event loop failed");
        if timed_out.get() {
            return false;
        }
        // The timer is still armed.
        self.event_loop.handle().remove(token);
        true
    }

    fn next_time(&mut self) -> u32 {
        self.time += 1;
        self.time
    }

    fn seat_event(&mut self, event: SeatEvent) {
        self.platform
            .send_seat_event(event)
            .expect("seat channel closed");
        self.dispatch();
    }

    pub fn press_key(&mut self, keycode: u32) {
        let time = self.next_time();
        self.seat_event(SeatEvent::Key {
            time,
            keycode,
            state: KeyState::Pressed,
        });
    }

    pub fn release_key(&mut self, keycode: u32) {
        let time = self.next_time();
        self.seat_event(SeatEvent::Key {
            time,
            keycode,
            state: KeyState::Released,
        });
    }

    /// Press and release `keycode` with `modifiers` held around it.
    pub fn chord(&mut self, modifiers: &[u32], keycode: u32) {
        for modifier in modifiers {
            self.press_key(*modifier);
        }
        self.press_key(keycode);
        self.release_key(keycode);
        for modifier in modifiers.iter().rev() {
            self.release_key(*modifier);
        }
    }

    pub fn move_pointer(&mut self, x: f64, y: f64) {
        let time = self.next_time();
        self.seat_event(SeatEvent::Motion {
            time,
            location: Point::from((x, y)),
        });
    }

    pub fn refocus(&mut self) {
        self.seat_event(SeatEvent::Refocus);
    }

    pub fn tty_event(&mut self, event: TtyEvent) {
        self.platform
            .send_tty_event(event)
            .expect("tty channel closed");
        self.dispatch();
    }

    pub fn complete_page_flip(&mut self, output: OutputId) {
        self.platform
            .complete_page_flip(output)
            .expect("drm channel closed");
        self.dispatch();
    }

    /// Create a surface for the test client and place it at `geometry`.
    pub fn add_surface(&mut self, geometry: Rectangle<i32, Logical>) -> SurfaceId {
        let (id, _) = self.add_surface_with_object(geometry);
        id
    }

    /// Like [`Self::add_surface`], also returning the surface's object id.
    pub fn add_surface_with_object(
        &mut self,
        geometry: Rectangle<i32, Logical>,
    ) -> (SurfaceId, ObjectId) {
        let object = self.client.new_object();
        let resource = self.compositor_resource;
        let compositor = self.compositor.as_mut().expect("compositor finished");
        let id = compositor
            .create_surface(&mut self.client, &resource, object)
            .expect("surface creation failed");
        if let Some(surface) = compositor.surface_mut(id) {
            surface.set_geometry(geometry);
        }
        (id, object)
    }

    /// Issue `create_surface` and return what the compositor returned.
    pub fn try_create_surface(&mut self) -> Option<SurfaceId> {
        let object = self.client.new_object();
        let resource = self.compositor_resource;
        let compositor = self.compositor.as_mut().expect("compositor finished");
        compositor.create_surface(&mut self.client, &resource, object)
    }

    pub fn try_create_region(&mut self) -> bool {
        let object = self.client.new_object();
        let resource = self.compositor_resource;
        let compositor = self.compositor.as_mut().expect("compositor finished");
        compositor.create_region(&mut self.client, &resource, object)
    }

    pub fn output_ids(&self) -> Vec<OutputId> {
        self.compositor().outputs().iter().map(|o| o.id()).collect()
    }

    pub fn render_count(&self, output: OutputId) -> usize {
        self.state().render_count(output)
    }

    pub fn flip_count(&self, output: OutputId) -> usize {
        self.state().flip_count(output)
    }

    /// Tear the compositor down. Returns the platform state for inspection.
    pub fn finish(&mut self) -> SharedState {
        if let Some(compositor) = self.compositor.take() {
            compositor.finish();
        }
        self.state.clone()
    }
}
