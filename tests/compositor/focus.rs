//! Pointer focus tests

use smithay::utils::{Logical, Point, Rectangle, Size};
use smithay::wayland::compositor::{RectangleKind, RegionAttributes};
use tern_core::testing::Fixture;

fn rect(x: i32, y: i32, w: i32, h: i32) -> Rectangle<i32, Logical> {
    Rectangle::new(Point::from((x, y)), Size::from((w, h)))
}

#[test]
fn test_first_surface_in_order_wins() {
    let mut fixture = Fixture::new().unwrap();
    let front = fixture.add_surface(rect(0, 0, 100, 100));
    let back = fixture.add_surface(rect(50, 50, 100, 100));

    fixture.move_pointer(75.0, 75.0);
    assert_eq!(fixture.compositor().pointer_focus(), Some(front));

    fixture.move_pointer(120.0, 120.0);
    assert_eq!(fixture.compositor().pointer_focus(), Some(back));

    fixture.move_pointer(500.0, 500.0);
    assert_eq!(fixture.compositor().pointer_focus(), None);

    assert_eq!(
        fixture.state().pointer_focus,
        vec![Some(front), Some(back), None]
    );
}

#[test]
fn test_point_outside_input_region_falls_through() {
    let mut fixture = Fixture::new().unwrap();
    let front = fixture.add_surface(rect(0, 0, 100, 100));
    let back = fixture.add_surface(rect(0, 0, 200, 200));

    // Only the left half of the front surface takes input.
    fixture
        .compositor_mut()
        .surface_mut(front)
        .unwrap()
        .set_input_region(Some(RegionAttributes {
            rects: vec![(RectangleKind::Add, rect(0, 0, 50, 100))],
        }));

    fixture.move_pointer(25.0, 25.0);
    assert_eq!(fixture.compositor().pointer_focus(), Some(front));

    // Inside the front surface's bounds but not its input region.
    fixture.move_pointer(75.0, 25.0);
    assert_eq!(fixture.compositor().pointer_focus(), Some(back));
}

#[test]
fn test_point_outside_every_input_region_clears_focus() {
    let mut fixture = Fixture::new().unwrap();
    let front = fixture.add_surface(rect(0, 0, 100, 100));
    let back = fixture.add_surface(rect(0, 0, 200, 200));

    // A hole in the middle of the front surface.
    fixture
        .compositor_mut()
        .surface_mut(front)
        .unwrap()
        .set_input_region(Some(RegionAttributes {
            rects: vec![
                (RectangleKind::Add, rect(0, 0, 100, 100)),
                (RectangleKind::Subtract, rect(40, 40, 20, 20)),
            ],
        }));
    // The back surface only takes input in its bottom right corner.
    fixture
        .compositor_mut()
        .surface_mut(back)
        .unwrap()
        .set_input_region(Some(RegionAttributes {
            rects: vec![(RectangleKind::Add, rect(150, 150, 50, 50))],
        }));

    fixture.move_pointer(10.0, 10.0);
    assert_eq!(fixture.compositor().pointer_focus(), Some(front));

    fixture.move_pointer(50.0, 50.0);
    assert_eq!(fixture.compositor().pointer_focus(), None);
    assert_eq!(fixture.state().pointer_focus.last(), Some(&None));

    fixture.move_pointer(175.0, 175.0);
    assert_eq!(fixture.compositor().pointer_focus(), Some(back));
}

#[test]
fn test_extreme_location_misses_negative_origin_surface() {
    let mut fixture = Fixture::new().unwrap();
    let surface = fixture.add_surface(rect(-10, -10, 20, 20));

    fixture.move_pointer(0.0, 0.0);
    assert_eq!(fixture.compositor().pointer_focus(), Some(surface));

    fixture.move_pointer(f64::MAX, f64::MAX);
    assert_eq!(fixture.compositor().pointer_focus(), None);
}

#[test]
fn test_location_is_truncated() {
    let mut fixture = Fixture::new().unwrap();
    let surface = fixture.add_surface(rect(10, 10, 10, 10));

    fixture.move_pointer(19.9, 19.9);
    assert_eq!(fixture.compositor().pointer_focus(), Some(surface));

    fixture.move_pointer(9.9, 15.0);
    assert_eq!(fixture.compositor().pointer_focus(), None);
    assert_eq!(fixture.compositor().pointer_location(), Point::from((9.9, 15.0)));
}

#[test]
fn test_refocus_picks_up_new_surface() {
    let mut fixture = Fixture::new().unwrap();
    fixture.move_pointer(5.0, 5.0);
    assert_eq!(fixture.compositor().pointer_focus(), None);

    let surface = fixture.add_surface(rect(0, 0, 10, 10));
    fixture.refocus();
    assert_eq!(fixture.compositor().pointer_focus(), Some(surface));
}

#[test]
fn test_unchanged_focus_is_not_renotified() {
    let mut fixture = Fixture::new().unwrap();
    fixture.add_surface(rect(0, 0, 100, 100));
    fixture.move_pointer(1.0, 1.0);
    fixture.move_pointer(2.0, 2.0);
    fixture.refocus();
    assert_eq!(fixture.state().pointer_focus.len(), 1);
}

#[test]
fn test_destroy_clears_focus() {
    let mut fixture = Fixture::new().unwrap();
    let surface = fixture.add_surface(rect(0, 0, 100, 100));
    fixture.compositor_mut().set_keyboard_focus(Some(surface));
    fixture.move_pointer(10.0, 10.0);

    assert!(fixture.compositor_mut().destroy_surface(surface).is_some());
    assert_eq!(fixture.compositor().pointer_focus(), None);
    assert_eq!(fixture.compositor().keyboard_focus(), None);
    assert_eq!(fixture.state().pointer_focus.last(), Some(&None));
    assert!(fixture.compositor_mut().destroy_surface(surface).is_none());
}

#[test]
fn test_keyboard_focus_rejects_unknown_surface() {
    let mut fixture = Fixture::new().unwrap();
    let surface = fixture.add_surface(rect(0, 0, 10, 10));
    fixture.compositor_mut().destroy_surface(surface);
    fixture.compositor_mut().set_keyboard_focus(Some(surface));
    assert_eq!(fixture.compositor().keyboard_focus(), None);
}
