//! Logical image-plane geometry.
//!
//! Points are plain `glam::DVec2` (engine viewport units or container pixels,
//! depending on the call). Rects are axis-aligned `(x, y, width, height)` and
//! serialize as a 4-element array, matching the `[x, y, w, h]` tuples used in
//! settings files.

use glam::DVec2;
use serde::{Deserialize, Serialize};

/// Point in viewport coordinates (or pixels for pointer positions).
pub type Point = DVec2;

/// Axis-aligned region in logical image-plane coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn center(&self) -> Point {
        DVec2::new(self.x + self.width * 0.5, self.y + self.height * 0.5)
    }

    /// Rect of the given size centered on `center`.
    pub fn from_center(center: Point, width: f64, height: f64) -> Self {
        Self::new(center.x - width * 0.5, center.y - height * 0.5, width, height)
    }

    pub fn aspect(&self) -> f64 {
        if self.height == 0.0 { 1.0 } else { self.width / self.height }
    }
}

impl From<[f64; 4]> for Rect {
    fn from(v: [f64; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<Rect> for [f64; 4] {
    fn from(r: Rect) -> Self {
        [r.x, r.y, r.width, r.height]
    }
}

/// Round half up, the way browser engines round (`-0.5` -> `0`, `100.5` -> `101`).
///
/// `f64::round` rounds half away from zero, which disagrees on negative halves.
#[inline]
pub fn round_half_up(v: f64) -> f64 {
    (v + 0.5).floor()
}
