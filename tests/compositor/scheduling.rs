//! Repaint scheduling tests

use proptest::prelude::*;
use smithay::utils::{Point, Rectangle, Size};
use tern_core::config::OutputConfig;
use tern_core::output::OutputId;
use tern_core::testing::Fixture;
use tern_core::Config;

fn two_outputs() -> Config {
    Config {
        outputs: vec![
            OutputConfig {
                name: "Virtual-1".into(),
                width: 1920,
                height: 1080,
                ..Default::default()
            },
            OutputConfig {
                name: "Virtual-2".into(),
                width: 1280,
                height: 720,
                ..Default::default()
            },
        ],
        ..Default::default()
    }
}

#[test]
fn test_schedule_all_renders_each_output_once() {
    let mut fixture = Fixture::with_config(two_outputs()).unwrap();
    fixture.compositor_mut().schedule_repaint_all();
    fixture.compositor_mut().schedule_repaint_all();
    fixture.dispatch();

    assert_eq!(fixture.render_count(OutputId(0)), 1);
    assert_eq!(fixture.render_count(OutputId(1)), 1);
}

#[test]
fn test_outputs_rearm_independently() {
    let mut fixture = Fixture::with_config(two_outputs()).unwrap();
    fixture.compositor_mut().schedule_repaint_all();
    fixture.dispatch();

    fixture.complete_page_flip(OutputId(1));
    assert!(!fixture.compositor_mut().schedule_repaint(OutputId(0)));
    assert!(fixture.compositor_mut().schedule_repaint(OutputId(1)));
    fixture.dispatch();

    assert_eq!(fixture.render_count(OutputId(0)), 1);
    assert_eq!(fixture.render_count(OutputId(1)), 2);
}

#[test]
fn test_unknown_output_is_not_scheduled() {
    let mut fixture = Fixture::new().unwrap();
    assert!(!fixture.compositor_mut().schedule_repaint(OutputId(9)));
    fixture.dispatch();
    assert!(fixture.state().renders.is_empty());
}

#[test]
fn test_damage_schedules_overlapping_outputs() {
    let mut fixture = Fixture::with_config(two_outputs()).unwrap();
    // Straddles the boundary at x = 1920.
    let wide = fixture.add_surface(Rectangle::new(
        Point::from((1900, 0)),
        Size::from((100, 100)),
    ));
    let right = fixture.add_surface(Rectangle::new(
        Point::from((2000, 0)),
        Size::from((10, 10)),
    ));

    fixture.compositor_mut().damage_surface(right);
    fixture.dispatch();
    assert_eq!(fixture.render_count(OutputId(0)), 0);
    assert_eq!(fixture.render_count(OutputId(1)), 1);

    fixture.complete_page_flip(OutputId(1));
    fixture.compositor_mut().damage_surface(wide);
    fixture.dispatch();
    assert_eq!(fixture.render_count(OutputId(0)), 1);
    assert_eq!(fixture.render_count(OutputId(1)), 2);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Any burst of requests between two loop iterations costs one render
    /// per requested output.
    #[test]
    fn prop_requests_coalesce(requests in prop::collection::vec(0u32..2, 1..40)) {
        let mut fixture = Fixture::with_config(two_outputs()).unwrap();
        for output in &requests {
            fixture.compositor_mut().schedule_repaint(OutputId(*output));
        }
        fixture.dispatch();

        for output in 0..2 {
            let expected = usize::from(requests.contains(&output));
            prop_assert_eq!(fixture.render_count(OutputId(output)), expected);
        }
    }
}
