use ratatui::style::Color;

/// Marker shown when the EDI range is degenerate and no gradient exists
/// (sky blue, same tone the rank list uses for EDI values).
pub const NEUTRAL_COLOR: Color = Color::Rgb(56, 189, 248);

pub const RADIUS_BASE: f64 = 8.0;
pub const RADIUS_SPAN: f64 = 18.0;
const RADIUS_EPS: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdiRange {
    pub min: f64,
    pub max: f64,
}

pub fn compute_range(values: impl IntoIterator<Item = f64>) -> EdiRange {
    let mut iter = values.into_iter();
    let Some(first) = iter.next() else {
        return EdiRange { min: 0.0, max: 0.0 };
    };
    let mut min = first;
    let mut max = first;
    for v in iter {
        if v < min {
            min = v;
        }
        if v > max {
            max = v;
        }
    }
    EdiRange { min, max }
}

/// Two-hue gradient from blue (low EDI) to red (high EDI). The value is
/// drawn from the same collection the range was computed over, so `t` stays
/// inside [0, 1] by construction.
pub fn color_for(value: f64, range: EdiRange) -> Color {
    if range.max == range.min {
        return NEUTRAL_COLOR;
    }
    let t = (value - range.min) / (range.max - range.min);
    let r = (255.0 * t).round() as u8;
    let g = (120.0 * (1.0 - t)).round() as u8;
    let b = (255.0 * (1.0 - t)).round() as u8;
    Color::Rgb(r, g, b)
}

/// Marker radius in [RADIUS_BASE, RADIUS_BASE + RADIUS_SPAN]. The epsilon in
/// the denominator keeps a single-valued collection at roughly the base
/// radius instead of dividing by zero.
pub fn radius_for(value: f64, range: EdiRange) -> f64 {
    let t = (value - range.min) / (range.max - range.min + RADIUS_EPS);
    RADIUS_BASE + t * RADIUS_SPAN
}
