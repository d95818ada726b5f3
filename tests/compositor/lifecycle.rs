//! Lifecycle tests
//!
//! Every stage is made to fail in turn; whatever was acquired before it must
//! be released, newest first, and nothing after it may be touched.

use std::cell::RefCell;
use std::rc::Rc;

use tern_core::backend::headless::LedgerEntry;
use tern_core::backend::HeadlessPlatform;
use tern_core::output::OutputId;
use tern_core::signal::ListenerAction;
use tern_core::testing::{Fixture, TestLayout};
use tern_core::{Config, InitError, InitStage};

fn failing_platform(stage: InitStage) -> HeadlessPlatform {
    HeadlessPlatform::new(Config::default())
        .with_layout(TestLayout::new())
        .manual_vblank()
        .fail_at(stage)
}

#[test]
fn test_rollback_at_every_stage() {
    for (index, stage) in InitStage::ALL.iter().copied().enumerate() {
        let platform = failing_platform(stage);
        let state = platform.state();

        let err = match Fixture::with_platform(platform) {
            Ok(_) => panic!("{stage} failure was not reported"),
            Err(err) => err,
        };
        let init = err
            .downcast_ref::<InitError>()
            .unwrap_or_else(|| panic!("unexpected error: {err:#}"));
        assert_eq!(init.stage, stage);
        assert_eq!(init.to_string(), format!("could not initialize {stage}"));

        let state = state.borrow();
        let earlier = &InitStage::ALL[..index];
        assert_eq!(state.acquired(), earlier, "acquired before {stage}");

        let expected: Vec<LedgerEntry> = earlier
            .iter()
            .rev()
            .map(|stage| LedgerEntry::Released(*stage))
            .collect();
        assert_eq!(state.released(), expected, "released after {stage} failed");
        assert!(!state.display_bound);
    }
}

#[test]
fn test_finish_releases_in_reverse_order() {
    let config = Config {
        outputs: vec![Default::default(), Default::default()],
        ..Default::default()
    };
    let mut fixture = Fixture::with_config(config).unwrap();
    assert_eq!(fixture.state().acquired(), InitStage::ALL);

    let state = fixture.finish();
    let state = state.borrow();
    assert_eq!(
        state.released(),
        vec![
            LedgerEntry::OutputReleased(OutputId(0)),
            LedgerEntry::OutputReleased(OutputId(1)),
            LedgerEntry::Released(InitStage::Renderer),
            LedgerEntry::Released(InitStage::DisplayBinding),
            LedgerEntry::Released(InitStage::RenderContext),
            LedgerEntry::Released(InitStage::Allocator),
            LedgerEntry::Released(InitStage::Drm),
            LedgerEntry::Released(InitStage::Seat),
            LedgerEntry::Released(InitStage::Tty),
            LedgerEntry::Released(InitStage::DeviceContext),
        ]
    );
    assert!(!state.display_bound);
}

#[test]
fn test_destroy_listeners_run_before_release() {
    let mut fixture = Fixture::new().unwrap();
    let state = fixture.platform().state();
    let seen = Rc::new(RefCell::new(Vec::new()));

    for name in ["first", "second"] {
        let seen = seen.clone();
        let state = state.clone();
        fixture.compositor_mut().on_destroy(move |compositor| {
            // Everything is still alive while listeners run.
            assert_eq!(compositor.outputs().len(), 1);
            seen.borrow_mut().push((name, state.borrow().released().len()));
            ListenerAction::Keep
        });
    }

    fixture.finish();
    assert_eq!(*seen.borrow(), vec![("first", 0), ("second", 0)]);
}

#[test]
fn test_removed_destroy_listener_is_not_notified() {
    let mut fixture = Fixture::new().unwrap();
    let called = Rc::new(RefCell::new(false));

    let flag = called.clone();
    let id = fixture.compositor_mut().on_destroy(move |_| {
        *flag.borrow_mut() = true;
        ListenerAction::Keep
    });
    assert!(fixture.compositor_mut().remove_destroy_listener(id));
    assert!(!fixture.compositor_mut().remove_destroy_listener(id));

    fixture.finish();
    assert!(!*called.borrow());
}

#[test]
fn test_no_events_after_finish() {
    let mut fixture = Fixture::new().unwrap();
    fixture.compositor_mut().schedule_repaint(OutputId(0));
    fixture.dispatch();
    let state = fixture.finish();

    // The drm channel was unregistered with its stage.
    assert!(fixture
        .platform()
        .complete_page_flip(OutputId(0))
        .is_err());
    assert_eq!(state.borrow().render_count(OutputId(0)), 1);
}
