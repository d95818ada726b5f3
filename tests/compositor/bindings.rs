//! Key binding tests

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use smithay::input::keyboard::xkb::keysyms;
use smithay::utils::{Point, Rectangle, Size};
use tern_core::input::KeyState;
use tern_core::testing::keycodes::*;
use tern_core::testing::Fixture;
use tern_core::{KeyBinding, Keysym, ModifierMask, Modifiers};

type Calls = Rc<RefCell<Vec<(&'static str, Keysym)>>>;

fn recorder(calls: &Calls, name: &'static str) -> impl Fn(&mut tern_core::Compositor, u32, Keysym) {
    let calls = calls.clone();
    move |_, _, keysym| calls.borrow_mut().push((name, keysym))
}

#[test]
fn test_first_registered_binding_wins() {
    let mut fixture = Fixture::new().unwrap();
    let calls = Calls::default();
    let k = 'k' as Keysym;
    fixture
        .compositor_mut()
        .add_key_binding(KeyBinding::new(Modifiers::LOGO, k, recorder(&calls, "first")));
    fixture
        .compositor_mut()
        .add_key_binding(KeyBinding::new(Modifiers::LOGO, k, recorder(&calls, "second")));
    fixture
        .compositor_mut()
        .add_key_binding(KeyBinding::new(ModifierMask::Any, k, recorder(&calls, "any")));

    fixture.chord(&[KEY_LEFTMETA], KEY_K);
    fixture.chord(&[], KEY_K);
    assert_eq!(*calls.borrow(), vec![("first", k), ("any", k)]);
}

#[test]
fn test_consumed_shift_does_not_count() {
    let mut fixture = Fixture::new().unwrap();
    let calls = Calls::default();
    let upper_a = 'A' as Keysym;
    fixture.compositor_mut().add_key_binding(KeyBinding::new(
        Modifiers::empty(),
        upper_a,
        recorder(&calls, "A"),
    ));
    fixture.compositor_mut().add_key_binding(KeyBinding::new(
        Modifiers::SHIFT,
        upper_a,
        recorder(&calls, "shift+A"),
    ));

    fixture.chord(&[KEY_LEFTSHIFT], KEY_A);
    assert_eq!(*calls.borrow(), vec![("A", upper_a)]);
}

#[test]
fn test_consumed_key_is_not_forwarded() {
    let mut fixture = Fixture::new().unwrap();
    let calls = Calls::default();
    let q = 'q' as Keysym;
    fixture
        .compositor_mut()
        .add_key_binding(KeyBinding::new(Modifiers::CTRL, q, recorder(&calls, "quit")));

    fixture.chord(&[KEY_LEFTCTRL], KEY_Q);
    assert_eq!(calls.borrow().len(), 1);

    // Ctrl press and release reach the client, the bound press does not.
    let keys: Vec<_> = fixture.state().keys.iter().map(|k| (k.1, k.2)).collect();
    assert_eq!(
        keys,
        vec![
            (KEY_LEFTCTRL, KeyState::Pressed),
            (KEY_Q, KeyState::Released),
            (KEY_LEFTCTRL, KeyState::Released),
        ]
    );
}

#[test]
fn test_unbound_keys_go_to_keyboard_focus() {
    let mut fixture = Fixture::new().unwrap();
    let surface = fixture.add_surface(Rectangle::new(Point::from((0, 0)), Size::from((10, 10))));
    fixture.compositor_mut().set_keyboard_focus(Some(surface));

    fixture.press_key(KEY_T);
    fixture.release_key(KEY_T);
    assert_eq!(
        fixture.state().keys,
        vec![
            (Some(surface), KEY_T, KeyState::Pressed),
            (Some(surface), KEY_T, KeyState::Released),
        ]
    );
}

#[test]
fn test_release_is_never_a_binding() {
    let mut fixture = Fixture::new().unwrap();
    let calls = Calls::default();
    fixture.compositor_mut().add_key_binding(KeyBinding::new(
        ModifierMask::Any,
        't' as Keysym,
        recorder(&calls, "t"),
    ));

    fixture.release_key(KEY_T);
    assert!(calls.borrow().is_empty());
    assert_eq!(fixture.state().keys.len(), 1);
}

#[test]
fn test_ctrl_alt_backspace_stops_loop() {
    let mut fixture = Fixture::new().unwrap();
    for key in [KEY_LEFTCTRL, KEY_LEFTALT] {
        fixture.press_key(key);
    }
    fixture
        .platform()
        .send_seat_event(tern_core::backend::SeatEvent::Key {
            time: 100,
            keycode: KEY_BACKSPACE,
            state: KeyState::Pressed,
        })
        .unwrap();

    assert!(fixture.run_until_stopped(Duration::from_secs(2)));
}

#[test]
fn test_loop_keeps_running_without_terminate() {
    let mut fixture = Fixture::new().unwrap();
    fixture
        .platform()
        .send_seat_event(tern_core::backend::SeatEvent::Key {
            time: 100,
            keycode: KEY_BACKSPACE,
            state: KeyState::Pressed,
        })
        .unwrap();

    assert!(!fixture.run_until_stopped(Duration::from_millis(50)));
}

#[test]
fn test_vt_switch_binding() {
    let mut fixture = Fixture::new().unwrap();
    assert_eq!(fixture.compositor().active_vt(), 1);

    fixture.chord(&[KEY_LEFTCTRL, KEY_LEFTALT], KEY_F3);
    assert_eq!(fixture.state().vt_switches, vec![3]);
    assert_eq!(fixture.compositor().active_vt(), 3);
    // Leaving our VT gives up the display.
    assert!(!fixture.state().master);

    fixture.chord(&[KEY_LEFTCTRL, KEY_LEFTALT], KEY_F1);
    assert_eq!(fixture.state().vt_switches, vec![3, 1]);
    assert!(fixture.state().master);
}

#[test]
fn test_vt_switch_to_active_vt_is_skipped() {
    let mut fixture = Fixture::new().unwrap();
    fixture.chord(&[KEY_LEFTCTRL, KEY_LEFTALT], KEY_F1);
    assert!(fixture.state().vt_switches.is_empty());
    assert!(fixture.state().master);
}

#[test]
fn test_default_bindings_registered() {
    let fixture = Fixture::new().unwrap();
    let bindings = fixture.compositor().key_bindings();
    assert_eq!(bindings.len(), 13);
    assert!(bindings
        .find(keysyms::KEY_BackSpace, Modifiers::CTRL | Modifiers::ALT)
        .is_some());
    assert!(bindings
        .find(keysyms::KEY_BackSpace, Modifiers::CTRL)
        .is_none());
    assert!(bindings
        .find(keysyms::KEY_XF86Switch_VT_12, Modifiers::SHIFT)
        .is_some());
}
