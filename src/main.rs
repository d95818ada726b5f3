//! Tern binary entry point
//!
//! Runs the compositor on the headless platform until Ctrl+Alt+Backspace
//! stops the event loop.

use tern_core::backend::HeadlessPlatform;
use tern_core::logging::init_logging;
use tern_core::{initialize, Compositor, Config};
use tracing::{debug, error, info, warn};

use smithay::reexports::calloop::EventLoop;

fn main() {
    init_logging();

    if let Err(err) = run() {
        error!("Fatal error: {:#}", err);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let config = Config::load()?;
    info!("Starting tern on {}", config.seat);

    let mut event_loop: EventLoop<Compositor> = EventLoop::try_new()?;
    let mut platform = HeadlessPlatform::new(config.clone());
    let display = Box::new(platform.display());

    let mut compositor = initialize(&event_loop, display, &mut platform, &config)?;
    compositor.add_globals();
    compositor.schedule_repaint_all();

    match serde_json::to_string(&compositor.info()) {
        Ok(info) => debug!("Compositor state: {}", info),
        Err(err) => warn!("Could not serialize compositor state: {}", err),
    }

    if let Err(err) = sd_notify::notify(true, &[sd_notify::NotifyState::Ready]) {
        warn!("Error notifying systemd: {err:?}");
    } else {
        info!("Notified systemd that compositor is ready");
    }

    event_loop.run(None, &mut compositor, |_| {})?;

    compositor.finish();
    info!("Exited cleanly");
    Ok(())
}
