//! Geometry and fractional scale helpers
//!
//! The fractional-scale protocol reports scales with N/120 precision. Window
//! sizes are tracked in logical pixels, while pointer positions and
//! everything handed to the application are in device (scaled) pixels.

use serde::Serialize;

/// Denominator of `wp_fractional_scale_v1.preferred_scale`.
pub const FRACTIONAL_SCALE_DENOMINATOR: f64 = 120.0;

/// 2D point or vector in device pixels
#[derive(Serialize, Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle, `x0..x1` by `y0..y1`
#[derive(Serialize, Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Rect {
    pub const ZERO: Rect = Rect {
        x0: 0.0,
        y0: 0.0,
        x1: 0.0,
        y1: 0.0,
    };

    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    /// Half-open containment: the left/top edges are inside, right/bottom are not.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        f64::from(self.x0) <= x && x < f64::from(self.x1) && f64::from(self.y0) <= y && y < f64::from(self.y1)
    }
}

/// Convert a `preferred_scale` value (N/120) to a floating point scale.
pub fn scale_from_fractional(value: u32) -> f64 {
    f64::from(value) / FRACTIONAL_SCALE_DENOMINATOR
}

/// Convert a logical length to device pixels, truncating toward zero.
///
/// Truncation matches how framebuffer sizes and hit-test margins are
/// derived, so a 1280 px window at 1.25 is exactly 1600 px wide.
pub fn to_physical(scale: f64, logical: impl Into<f64>) -> i32 {
    (logical.into() * scale) as i32
}

/// Convert a device pixel coordinate back to surface-local logical units.
pub fn to_logical(scale: f64, physical: f64) -> f64 {
    if scale > 0.0 {
        physical / scale
    } else {
        physical
    }
}
