use ratatui::style::Color;

use spomap_terminal::scale::{
    color_for, compute_range, radius_for, EdiRange, NEUTRAL_COLOR, RADIUS_BASE, RADIUS_SPAN,
};

#[test]
fn compute_range_finds_true_min_and_max() {
    let range = compute_range([60.0, -40.0, 12.5, 0.0]);
    assert!(range.min <= range.max);
    assert_eq!(range.min, -40.0);
    assert_eq!(range.max, 60.0);
}

#[test]
fn compute_range_empty_input_is_zero_zero() {
    let range = compute_range(std::iter::empty::<f64>());
    assert_eq!(range.min, 0.0);
    assert_eq!(range.max, 0.0);
}

#[test]
fn color_endpoints_are_blue_and_red() {
    let range = EdiRange {
        min: -40.0,
        max: 60.0,
    };
    assert_eq!(color_for(-40.0, range), Color::Rgb(0, 120, 255));
    assert_eq!(color_for(60.0, range), Color::Rgb(255, 0, 0));
}

#[test]
fn color_is_deterministic() {
    let range = EdiRange { min: 0.0, max: 10.0 };
    assert_eq!(color_for(4.2, range), color_for(4.2, range));
}

#[test]
fn degenerate_range_yields_neutral_color() {
    let range = EdiRange { min: 5.0, max: 5.0 };
    assert_eq!(color_for(5.0, range), NEUTRAL_COLOR);
}

#[test]
fn degenerate_range_radius_is_close_to_base() {
    let range = EdiRange { min: 5.0, max: 5.0 };
    let radius = radius_for(5.0, range);
    assert!((radius - RADIUS_BASE).abs() < 1e-3);
}

#[test]
fn radius_is_monotonic_and_within_bounds() {
    let values = [-40.0, -10.0, 0.0, 12.5, 33.0, 60.0];
    let range = compute_range(values);
    let mut last = f64::NEG_INFINITY;
    for v in values {
        let radius = radius_for(v, range);
        assert!(radius >= last, "radius must not decrease as EDI grows");
        assert!(radius >= RADIUS_BASE - 1e-3);
        assert!(radius <= RADIUS_BASE + RADIUS_SPAN + 1e-3);
        last = radius;
    }
}
