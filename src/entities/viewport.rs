//! Declared viewport intent (inbound) and settled viewport report (outbound).

use serde::{Deserialize, Serialize};

use super::geometry::{Point, Rect};

/// Desired camera state supplied by the caller on every render.
///
/// Every field is optional; absent fields leave the engine alone.
/// Point/zoom fields take precedence over `bounds` (see the reconciler).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewportIntent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounds: Option<Rect>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zoom: Option<f64>,
    /// Degrees.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flip: Option<bool>,
}

impl ViewportIntent {
    pub fn with_bounds(mut self, bounds: Rect) -> Self {
        self.bounds = Some(bounds);
        self
    }

    pub fn with_center(mut self, x: f64, y: f64) -> Self {
        self.x = Some(x);
        self.y = Some(y);
        self
    }

    pub fn with_zoom(mut self, zoom: f64) -> Self {
        self.zoom = Some(zoom);
        self
    }

    pub fn with_rotation(mut self, degrees: f64) -> Self {
        self.rotation = Some(degrees);
        self
    }

    pub fn with_flip(mut self, flip: bool) -> Self {
        self.flip = Some(flip);
        self
    }

    /// Declared center, only when both coordinates are present.
    pub fn point(&self) -> Option<Point> {
        match (self.x, self.y) {
            (Some(x), Some(y)) => Some(Point::new(x, y)),
            _ => None,
        }
    }

    /// True when any of x, y or zoom is declared; bounds are ignored then.
    pub fn has_point_or_zoom(&self) -> bool {
        self.x.is_some() || self.y.is_some() || self.zoom.is_some()
    }
}

/// Snapshot of the engine camera after an animation settles.
///
/// `x`/`y` are the rounded pan *targets*, `zoom` is the raw zoom target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportReport {
    pub bounds: Rect,
    pub flip: bool,
    pub rotation: f64,
    pub x: i64,
    pub y: i64,
    pub zoom: f64,
}

/// Intent that restates a report: point, zoom, rotation and flip.
impl From<ViewportReport> for ViewportIntent {
    fn from(r: ViewportReport) -> Self {
        ViewportIntent::default()
            .with_center(r.x as f64, r.y as f64)
            .with_zoom(r.zoom)
            .with_rotation(r.rotation)
            .with_flip(r.flip)
    }
}
