//! Simulated camera with current/target springs.
//!
//! Model: `zoom` is relative to the home region (`zoom == 1` shows the home
//! width). The visible width is `home.width / zoom`, the visible height
//! follows the container aspect. Non-immediate moves only change targets;
//! `finish_animation()` snaps current values onto targets.
//!
//! Rotation is recorded but does not affect bounds or pixel mapping.

use std::sync::Mutex;

use log::{debug, warn};

use crate::core::HandlerBus;
use crate::entities::{Point, Rect, ViewerEvent, Viewport};

use super::journal::{EngineCall, Journal};

/// Default container size in pixels
pub const DEFAULT_CONTAINER: Point = Point::new(500.0, 500.0);

#[derive(Debug, Clone, Copy)]
struct Camera {
    center: Point,
    center_target: Point,
    zoom: f64,
    zoom_target: f64,
    rotation: f64,
    flip: bool,
}

pub struct SimViewport {
    camera: Mutex<Camera>,
    home: Rect,
    container: Point,
    journal: Journal,
    bus: HandlerBus,
}

impl SimViewport {
    pub fn new(home: Rect, container: Point, journal: Journal, bus: HandlerBus) -> Self {
        let mut vp = Self {
            camera: Mutex::new(Camera {
                center: home.center(),
                center_target: home.center(),
                zoom: 1.0,
                zoom_target: 1.0,
                rotation: 0.0,
                flip: false,
            }),
            home,
            container,
            journal,
            bus,
        };
        // Start on the fitted home view
        let (center, zoom) = vp.fit_params(home);
        let cam = vp.camera.get_mut().unwrap_or_else(|e| e.into_inner());
        cam.center = center;
        cam.center_target = center;
        cam.zoom = zoom;
        cam.zoom_target = zoom;
        vp
    }

    pub fn home(&self) -> Rect {
        self.home
    }

    pub fn container_size(&self) -> Point {
        self.container
    }

    fn camera(&self) -> Camera {
        *self.camera.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn update(&self, f: impl FnOnce(&mut Camera)) {
        {
            let mut cam = self.camera.lock().unwrap_or_else(|e| e.into_inner());
            f(&mut cam);
        }
        // Lock released before handlers run
        self.bus.emit(ViewerEvent::ViewportChange);
    }

    fn container_aspect(&self) -> f64 {
        if self.container.y == 0.0 { 1.0 } else { self.container.x / self.container.y }
    }

    /// Center and zoom that make `rect` fill the container.
    fn fit_params(&self, rect: Rect) -> (Point, f64) {
        let aspect = self.container_aspect();
        let width = if rect.aspect() > aspect { rect.width } else { rect.height * aspect };
        let zoom = if width > 0.0 { self.home.width / width } else { 1.0 };
        (rect.center(), zoom)
    }

    fn bounds_for(&self, center: Point, zoom: f64) -> Rect {
        let width = self.home.width / zoom;
        Rect::from_center(center, width, width / self.container_aspect())
    }

    fn fit(&self, rect: Rect, immediately: bool) {
        let (center, zoom) = self.fit_params(rect);
        self.update(|cam| {
            cam.center_target = center;
            cam.zoom_target = zoom;
            if immediately {
                cam.center = center;
                cam.zoom = zoom;
            }
        });
    }

    /// Snap current values onto targets. Returns true if anything moved.
    pub fn finish_animation(&self) -> bool {
        let mut cam = self.camera.lock().unwrap_or_else(|e| e.into_inner());
        let moved = cam.center != cam.center_target || cam.zoom != cam.zoom_target;
        cam.center = cam.center_target;
        cam.zoom = cam.zoom_target;
        moved
    }

    pub fn is_animating(&self) -> bool {
        let cam = self.camera();
        cam.center != cam.center_target || cam.zoom != cam.zoom_target
    }

    /// Engine-side pan by a pixel delta (user drag).
    pub fn pan_by_pixels(&self, delta: Point) {
        let cam = self.camera();
        let b = self.bounds_for(cam.center_target, cam.zoom_target);
        let mut dx = delta.x / self.container.x * b.width;
        if cam.flip {
            dx = -dx;
        }
        let dy = delta.y / self.container.y * b.height;
        // Dragging moves the image with the pointer, the camera the other way
        let target = cam.center_target - Point::new(dx, dy);
        debug!("SimViewport: drag pan to ({:.1}, {:.1})", target.x, target.y);
        self.update(|c| c.center_target = target);
    }
}

impl Viewport for SimViewport {
    fn bounds(&self) -> Rect {
        let cam = self.camera();
        self.bounds_for(cam.center_target, cam.zoom_target)
    }

    fn fit_bounds(&self, rect: Rect, immediately: bool) {
        self.journal.record(EngineCall::FitBounds { rect, immediately });
        self.fit(rect, immediately);
    }

    fn rotation(&self) -> f64 {
        self.camera().rotation
    }

    fn set_rotation(&self, degrees: f64) {
        self.journal.record(EngineCall::SetRotation(degrees));
        self.update(|cam| cam.rotation = degrees);
    }

    fn flip(&self) -> bool {
        self.camera().flip
    }

    fn set_flip(&self, flip: bool) {
        self.journal.record(EngineCall::SetFlip(flip));
        self.update(|cam| cam.flip = flip);
    }

    fn center(&self) -> Point {
        self.camera().center
    }

    fn center_target(&self) -> Point {
        self.camera().center_target
    }

    fn pan_to(&self, center: Point, immediately: bool) {
        self.journal.record(EngineCall::PanTo { center, immediately });
        self.update(|cam| {
            cam.center_target = center;
            if immediately {
                cam.center = center;
            }
        });
    }

    fn zoom(&self) -> f64 {
        self.camera().zoom
    }

    fn zoom_target(&self) -> f64 {
        self.camera().zoom_target
    }

    fn zoom_to(&self, zoom: f64, ref_point: Option<Point>, immediately: bool) {
        self.journal.record(EngineCall::ZoomTo { zoom, ref_point, immediately });
        if !(zoom.is_finite() && zoom > 0.0) {
            warn!("SimViewport: ignoring zoom {}", zoom);
            return;
        }
        self.update(|cam| {
            // Keep ref_point fixed on screen
            if let Some(r) = ref_point {
                cam.center_target = r + (cam.center_target - r) * (cam.zoom_target / zoom);
            }
            cam.zoom_target = zoom;
            if immediately {
                cam.center = cam.center_target;
                cam.zoom = zoom;
            }
        });
    }

    fn go_home(&self, immediately: bool) {
        self.journal.record(EngineCall::GoHome { immediately });
        self.fit(self.home, immediately);
    }

    fn point_from_pixel(&self, pixel: Point) -> Point {
        let cam = self.camera();
        let b = self.bounds_for(cam.center_target, cam.zoom_target);
        let fx = pixel.x / self.container.x;
        let fy = pixel.y / self.container.y;
        let x = if cam.flip { b.x + b.width * (1.0 - fx) } else { b.x + b.width * fx };
        Point::new(x, b.y + b.height * fy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport() -> SimViewport {
        SimViewport::new(
            Rect::new(0.0, 0.0, 1000.0, 1000.0),
            Point::new(500.0, 500.0),
            Journal::new(),
            HandlerBus::new(),
        )
    }

    #[test]
    fn test_starts_at_home() {
        let vp = viewport();
        assert_eq!(vp.bounds(), Rect::new(0.0, 0.0, 1000.0, 1000.0));
        assert_eq!(vp.zoom(), 1.0);
        assert!(!vp.is_animating());
    }

    #[test]
    fn test_animated_pan_moves_target_only() {
        let vp = viewport();
        vp.pan_to(Point::new(100.0, 200.0), false);
        assert_eq!(vp.center_target(), Point::new(100.0, 200.0));
        assert_eq!(vp.center(), Point::new(500.0, 500.0));
        assert!(vp.is_animating());

        assert!(vp.finish_animation());
        assert_eq!(vp.center(), Point::new(100.0, 200.0));
    }

    #[test]
    fn test_fit_bounds_square() {
        let vp = viewport();
        vp.fit_bounds(Rect::new(0.0, 0.0, 500.0, 500.0), true);
        assert_eq!(vp.zoom(), 2.0);
        assert_eq!(vp.bounds(), Rect::new(0.0, 0.0, 500.0, 500.0));
    }

    #[test]
    fn test_zoom_keeps_ref_point() {
        let vp = viewport();
        let r = Point::new(250.0, 250.0);
        vp.zoom_to(2.0, Some(r), true);
        // Center moved halfway toward ref point
        assert_eq!(vp.center(), Point::new(375.0, 375.0));
        assert_eq!(vp.zoom_target(), 2.0);
    }

    #[test]
    fn test_point_from_pixel() {
        let vp = viewport();
        assert_eq!(vp.point_from_pixel(Point::new(250.0, 0.0)), Point::new(500.0, 0.0));
        vp.set_flip(true);
        assert_eq!(vp.point_from_pixel(Point::new(250.0, 0.0)), Point::new(500.0, 0.0));
        assert_eq!(vp.point_from_pixel(Point::new(0.0, 0.0)), Point::new(1000.0, 0.0));
    }

    #[test]
    fn test_mutations_emit_viewport_change() {
        let bus = HandlerBus::new();
        let vp = SimViewport::new(Rect::new(0.0, 0.0, 1.0, 1.0), DEFAULT_CONTAINER, Journal::new(), bus.clone());
        vp.set_rotation(90.0);
        vp.go_home(true);
        assert_eq!(bus.poll(), vec![ViewerEvent::ViewportChange, ViewerEvent::ViewportChange]);
    }
}
