//! Staged startup and ordered teardown
//!
//! [`initialize`] brings subsystems up in [`InitStage`] order. Each one is
//! wrapped in a [`Stage`] guard the moment it exists, so a failure at any
//! later stage unwinds only what was acquired, newest first, by plain
//! scope exit. The guards then move into [`Compositor`], whose field order
//! repeats the same reverse order for the final teardown.
//!
//! # Design Invariants
//!
//! 1. **Sources before subsystems**: a guard removes the event sources it
//!    registered before finishing its subsystem, so no event can arrive for
//!    a released device.
//!
//! 2. **Unbind before release**: the display binding is undone before the
//!    render context is finished.

use std::ops::{Deref, DerefMut};

use anyhow::anyhow;
use smithay::input::keyboard::xkb::keysyms;
use smithay::reexports::calloop::{
    channel::{Channel, Event as ChannelEvent},
    EventLoop, LoopHandle, RegistrationToken,
};
use smithay::utils::Point;
use tracing::{debug, info, warn};

use crate::backend::{
    BufferAllocator, DeviceContext, Drm, Platform, RenderContext, Renderer, Seat, Subsystem, Tty,
};
use crate::binding::{KeyBinding, ModifierMask, Modifiers};
use crate::compositor::Compositor;
use crate::config::Config;
use crate::error::{InitError, InitStage};
use crate::output::Output;
use crate::protocol::ProtocolDisplay;
use crate::signal::Signal;
use crate::surface::SurfaceList;

/// An acquired subsystem, finished when dropped.
pub struct Stage<T: ?Sized + Subsystem> {
    stage: InitStage,
    sources: Vec<RegistrationToken>,
    loop_handle: Option<LoopHandle<'static, Compositor>>,
    inner: Box<T>,
}

impl<T: ?Sized + Subsystem> Stage<T> {
    fn new(stage: InitStage, inner: Box<T>) -> Self {
        info!("Initialized {}", stage);
        Self {
            stage,
            sources: Vec::new(),
            loop_handle: None,
            inner,
        }
    }

    pub fn stage(&self) -> InitStage {
        self.stage
    }

    /// Route events from `channel` into `dispatch` until this guard drops.
    fn watch<E: 'static>(
        &mut self,
        handle: &LoopHandle<'static, Compositor>,
        channel: Channel<E>,
        mut dispatch: impl FnMut(E, &mut Compositor) + 'static,
    ) -> anyhow::Result<()> {
        let token = handle
            .insert_source(channel, move |event, _, compositor| {
                if let ChannelEvent::Msg(event) = event {
                    dispatch(event, compositor);
                }
            })
            .map_err(|err| anyhow!("could not add {} event source: {}", self.stage, err.error))?;
        self.sources.push(token);
        self.loop_handle = Some(handle.clone());
        Ok(())
    }
}

impl<T: ?Sized + Subsystem> Deref for Stage<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T: ?Sized + Subsystem> DerefMut for Stage<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.inner
    }
}

impl<T: ?Sized + Subsystem> Drop for Stage<T> {
    fn drop(&mut self) {
        if let Some(handle) = &self.loop_handle {
            for token in self.sources.drain(..) {
                handle.remove(token);
            }
        }
        debug!("Releasing {}", self.stage);
        self.inner.finish();
    }
}

/// Render context with the protocol display bound to it.
pub struct DisplayBinding {
    context: Stage<dyn RenderContext>,
}

impl DisplayBinding {
    fn bind(
        mut context: Stage<dyn RenderContext>,
        display: &mut dyn ProtocolDisplay,
    ) -> anyhow::Result<Self> {
        context.bind_display(display)?;
        info!("Initialized {}", InitStage::DisplayBinding);
        Ok(Self { context })
    }
}

impl Drop for DisplayBinding {
    fn drop(&mut self) {
        debug!("Releasing {}", InitStage::DisplayBinding);
        self.context.unbind_display();
    }
}

fn failed(stage: InitStage) -> impl FnOnce(anyhow::Error) -> InitError {
    move |source| {
        warn!("Could not initialize {}: {:#}", stage, source);
        InitError::new(stage, source)
    }
}

/// Bring up every subsystem in order and assemble the compositor.
///
/// On failure everything acquired so far is released in reverse order and
/// the failing stage is reported.
pub fn initialize(
    event_loop: &EventLoop<'static, Compositor>,
    mut display: Box<dyn ProtocolDisplay>,
    platform: &mut dyn Platform,
    config: &Config,
) -> Result<Compositor, InitError> {
    use smithay::reexports::calloop::channel::channel;

    let handle = event_loop.handle();

    let device_context: Stage<dyn DeviceContext> = Stage::new(
        InitStage::DeviceContext,
        platform
            .device_context()
            .map_err(failed(InitStage::DeviceContext))?,
    );

    let (tty_events, tty_channel) = channel();
    let mut tty: Stage<dyn Tty> = Stage::new(
        InitStage::Tty,
        platform
            .tty(&*device_context, &handle, config.vt, tty_events)
            .map_err(failed(InitStage::Tty))?,
    );
    tty.watch(&handle, tty_channel, |event, compositor| {
        compositor.handle_tty_event(event)
    })
    .map_err(failed(InitStage::Tty))?;

    let (seat_events, seat_channel) = channel();
    let mut seat: Stage<dyn Seat> = Stage::new(
        InitStage::Seat,
        platform
            .seat(&*device_context, &config.seat, seat_events)
            .map_err(failed(InitStage::Seat))?,
    );
    seat.add_event_sources(&handle)
        .map_err(failed(InitStage::Seat))?;
    seat.watch(&handle, seat_channel, |event, compositor| {
        compositor.handle_seat_event(event)
    })
    .map_err(failed(InitStage::Seat))?;

    let (drm_events, drm_channel) = channel();
    let mut drm: Stage<dyn Drm> = Stage::new(
        InitStage::Drm,
        platform
            .drm(&*device_context, &config.seat, drm_events)
            .map_err(failed(InitStage::Drm))?,
    );
    drm.add_event_sources(&handle)
        .map_err(failed(InitStage::Drm))?;
    drm.watch(&handle, drm_channel, |event, compositor| {
        compositor.handle_drm_event(event)
    })
    .map_err(failed(InitStage::Drm))?;

    let allocator: Stage<dyn BufferAllocator> = Stage::new(
        InitStage::Allocator,
        platform
            .allocator(&*drm)
            .map_err(failed(InitStage::Allocator))?,
    );

    let render_context: Stage<dyn RenderContext> = Stage::new(
        InitStage::RenderContext,
        platform
            .render_context(&*allocator)
            .map_err(failed(InitStage::RenderContext))?,
    );
    let display_binding = DisplayBinding::bind(render_context, &mut *display)
        .map_err(failed(InitStage::DisplayBinding))?;

    let renderer: Stage<dyn Renderer> = Stage::new(
        InitStage::Renderer,
        platform
            .renderer(&*drm, &*allocator)
            .map_err(failed(InitStage::Renderer))?,
    );

    let outputs: Vec<Output> = drm
        .create_outputs()
        .map_err(failed(InitStage::Outputs))?
        .into_iter()
        .map(Output::new)
        .collect();
    info!("Initialized {} ({} found)", InitStage::Outputs, outputs.len());

    let mut compositor = Compositor {
        loop_handle: handle,
        loop_signal: event_loop.get_signal(),
        destroy_signal: Signal::new(),
        key_bindings: Default::default(),
        surfaces: SurfaceList::new(),
        next_surface_id: 1,
        pointer_focus: None,
        keyboard_focus: None,
        pointer_location: Point::from((0.0, 0.0)),
        outputs,
        renderer,
        display_binding,
        allocator,
        drm,
        seat,
        tty,
        device_context,
        display,
    };
    add_default_bindings(&mut compositor);

    info!("Compositor initialized");
    Ok(compositor)
}

/// Ctrl+Alt+Backspace stops the loop, XF86Switch_VT_n switches to VT n.
fn add_default_bindings(compositor: &mut Compositor) {
    compositor.add_key_binding(KeyBinding::new(
        Modifiers::CTRL | Modifiers::ALT,
        keysyms::KEY_BackSpace,
        |compositor, _, _| {
            info!("Terminate binding pressed");
            compositor.stop();
        },
    ));

    for keysym in keysyms::KEY_XF86Switch_VT_1..=keysyms::KEY_XF86Switch_VT_12 {
        compositor.add_key_binding(KeyBinding::new(
            ModifierMask::Any,
            keysym,
            |compositor, _, keysym| {
                compositor.switch_vt(keysym - keysyms::KEY_XF86Switch_VT_1 + 1);
            },
        ));
    }
}

impl Compositor {
    /// Tear down in reverse initialization order.
    pub fn finish(self) {
        info!("Finishing compositor");
        drop(self);
    }
}
