//! Globals and compositor request tests

use std::cell::Cell;
use std::rc::Rc;

use tern_core::backend::headless::{OUTPUT_VERSION, SEAT_VERSION};
use tern_core::globals::{COMPOSITOR_VERSION, DATA_DEVICE_MANAGER_VERSION};
use tern_core::output::OutputId;
use tern_core::protocol::{ClientId, GlobalKind, ObjectId};
use tern_core::testing::Fixture;

#[test]
fn test_globals_advertised() {
    let fixture = Fixture::new().unwrap();
    assert_eq!(
        fixture.state().globals,
        vec![
            (GlobalKind::Compositor, COMPOSITOR_VERSION),
            (GlobalKind::DataDeviceManager, DATA_DEVICE_MANAGER_VERSION),
            (GlobalKind::Seat, SEAT_VERSION),
            (GlobalKind::Output(OutputId(0)), OUTPUT_VERSION),
        ]
    );
}

#[test]
fn test_compositor_version_capped() {
    let fixture = Fixture::new().unwrap();
    let compositor = fixture.compositor();
    assert_eq!(compositor.bind_compositor(ClientId(2), 6, ObjectId(9)).version, 3);
    assert_eq!(compositor.bind_compositor(ClientId(2), 1, ObjectId(9)).version, 1);
}

#[test]
fn test_create_surface_appends() {
    let mut fixture = Fixture::new().unwrap();
    let first = fixture.try_create_surface().unwrap();
    let second = fixture.try_create_surface().unwrap();
    assert_ne!(first, second);

    let ids: Vec<_> = fixture.compositor().surfaces().iter().map(|s| s.id()).collect();
    assert_eq!(ids, vec![first, second]);
    assert_eq!(fixture.compositor().surface(first).unwrap().client(), ClientId(1));
}

#[test]
fn test_allocation_failure_posts_no_memory() {
    let mut fixture = Fixture::new().unwrap();
    fixture.state_mut().fail_allocation = true;

    assert_eq!(fixture.try_create_surface(), None);
    assert!(!fixture.try_create_region());
    assert!(fixture.compositor().surfaces().is_empty());
    // Both errors land on the compositor object the client bound.
    assert_eq!(fixture.client().no_memory, vec![ObjectId(2), ObjectId(2)]);

    // The compositor carries on.
    fixture.state_mut().fail_allocation = false;
    assert!(fixture.try_create_surface().is_some());
    assert!(fixture.try_create_region());
}

#[test]
fn test_late_output_not_advertised() {
    let mut fixture = Fixture::new().unwrap();
    let before = fixture.state().globals.len();

    let id = fixture.compositor_mut().add_output(Box::new(LateOutput::new(7)));
    assert_eq!(id, Some(OutputId(7)));
    assert_eq!(fixture.compositor().outputs().len(), 2);
    assert_eq!(fixture.state().globals.len(), before);

    // It is repainted like any other.
    assert!(fixture.compositor_mut().schedule_repaint(OutputId(7)));
    fixture.dispatch();
    assert_eq!(fixture.render_count(OutputId(7)), 1);
}

#[test]
fn test_duplicate_output_id_rejected() {
    let mut fixture = Fixture::new().unwrap();
    let late = LateOutput::new(0);
    let finished = late.finished.clone();

    assert_eq!(fixture.compositor_mut().add_output(Box::new(late)), None);
    assert!(finished.get());
    assert_eq!(fixture.compositor().outputs().len(), 1);
    assert_eq!(fixture.compositor().output(OutputId(0)).unwrap().name(), "Virtual-1");
}

struct LateOutput {
    id: OutputId,
    finished: Rc<Cell<bool>>,
}

impl LateOutput {
    fn new(id: u32) -> Self {
        Self {
            id: OutputId(id),
            finished: Rc::new(Cell::new(false)),
        }
    }
}

impl tern_core::output::OutputDevice for LateOutput {
    fn id(&self) -> OutputId {
        self.id
    }

    fn name(&self) -> &str {
        "Late-1"
    }

    fn geometry(&self) -> smithay::utils::Rectangle<i32, smithay::utils::Logical> {
        smithay::utils::Rectangle::from_size((800, 600).into())
    }

    fn switch_buffer(&mut self, _buffer: usize) -> anyhow::Result<()> {
        Ok(())
    }

    fn add_globals(&mut self, display: &mut dyn tern_core::protocol::ProtocolDisplay) {
        display.create_global(GlobalKind::Output(self.id()), OUTPUT_VERSION);
    }

    fn finish(&mut self) {
        self.finished.set(true);
    }
}
