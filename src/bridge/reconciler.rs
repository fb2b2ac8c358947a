//! Viewport reconciler - declared intent in, settled camera reports out.
//!
//! Two phases with different policies:
//!
//! **Initial application** ([`apply_initial`]) runs once, from a one-shot
//! viewport-change handler, and applies whatever is declared:
//! point, zoom, rotation, flip; bounds (or home) only when neither point
//! nor zoom is declared.
//!
//! **Reconciliation** ([`reconcile`]) runs on every later render and only
//! issues a call when the live camera *target* differs from the intent.
//! Engine-driven moves echoed back by the caller therefore never bounce
//! back into the engine.
//!
//! Bounds are fit during reconciliation only when the declared bounds value
//! changed, point/zoom are absent and the requested region already equals
//! the live region.
//!
//! **Reporting** ([`read_report`]) runs on every animation-finish.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use log::{debug, trace};

use crate::core::ViewerHandle;
use crate::entities::{
    EventKind, ViewerEvent, Viewport, ViewportIntent, ViewportReport, round_half_up,
};

use super::lifecycle::HandlerBindings;

/// Caller-supplied viewport report callback.
pub type ReportFn = Arc<dyn Fn(ViewportReport) + Send + Sync>;

#[derive(Default)]
struct ReconcilerState {
    intent: Mutex<ViewportIntent>,
    initial_applied: AtomicBool,
    on_report: Mutex<Option<ReportFn>>,
}

impl ReconcilerState {
    fn intent(&self) -> ViewportIntent {
        self.intent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn report_fn(&self) -> Option<ReportFn> {
        self.on_report.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

/// Holds the latest intent and the report callback for one viewer.
#[derive(Clone, Default)]
pub struct Reconciler {
    state: Arc<ReconcilerState>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intent(&self) -> ViewportIntent {
        self.state.intent()
    }

    /// Replace the report callback; the next animation-finish uses it.
    pub fn set_report_callback(&self, callback: Option<ReportFn>) {
        *self.state.on_report.lock().unwrap_or_else(|e| e.into_inner()) = callback;
    }

    pub fn initial_applied(&self) -> bool {
        self.state.initial_applied.load(Ordering::SeqCst)
    }

    /// Subscribe the one-shot initial handler and the report handler.
    pub fn install(&self, bindings: &mut HandlerBindings) {
        let state = Arc::clone(&self.state);
        let engine = bindings.engine();
        bindings.once(EventKind::ViewportChange, move |_e: &ViewerEvent| {
            let Some(engine) = engine.upgrade() else { return };
            // Latest intent, not the one declared at construction
            let intent = state.intent();
            debug!("Applying initial viewport {:?}", intent);
            apply_initial(engine.viewport(), &intent);
            state.initial_applied.store(true, Ordering::SeqCst);
        });

        let state = Arc::clone(&self.state);
        let engine = bindings.engine();
        bindings.on(EventKind::AnimationFinish, move |_e: &ViewerEvent| {
            let Some(engine) = engine.upgrade() else { return };
            let report = read_report(engine.viewport());
            trace!("Viewport settled: {:?}", report);
            if let Some(callback) = state.report_fn() {
                callback(report);
            }
        });
    }

    /// Store a new intent and reconcile it against `viewer`.
    ///
    /// Point, zoom, rotation and flip are checked against the live targets on
    /// every call. Bounds only take part when their declared value changed.
    ///
    /// Returns true if reconciliation ran. A missing viewer and a viewer
    /// whose initial handler has not fired are no-ops.
    pub fn update(&self, viewer: Option<&ViewerHandle>, intent: &ViewportIntent) -> bool {
        let previous = std::mem::replace(
            &mut *self.state.intent.lock().unwrap_or_else(|e| e.into_inner()),
            intent.clone(),
        );
        if !self.initial_applied() {
            trace!("Viewport intent stored, initial application pending");
            return false;
        }
        let Some(viewer) = viewer.filter(|v| v.is_live()) else {
            trace!("No live viewer, viewport intent not applied");
            return false;
        };

        if previous.bounds == intent.bounds {
            let pass = ViewportIntent { bounds: None, ..intent.clone() };
            reconcile(viewer.engine().viewport(), &pass);
        } else {
            reconcile(viewer.engine().viewport(), intent);
        }
        true
    }

    /// Forget the initial application (new engine instance).
    pub fn reset(&self) {
        self.state.initial_applied.store(false, Ordering::SeqCst);
    }
}

/// One-time application of the declared intent.
pub fn apply_initial(viewport: &dyn Viewport, intent: &ViewportIntent) {
    let point = intent.point();
    if let Some(center) = point {
        viewport.pan_to(center, true);
    }
    if let Some(zoom) = intent.zoom {
        viewport.zoom_to(zoom, point, true);
    }
    if let Some(rotation) = intent.rotation {
        if rotation != viewport.rotation() {
            viewport.set_rotation(rotation);
        }
    }
    if let Some(flip) = intent.flip {
        if flip != viewport.flip() {
            viewport.set_flip(flip);
        }
    }
    if !intent.has_point_or_zoom() {
        match intent.bounds {
            Some(bounds) => viewport.fit_bounds(bounds, true),
            None => viewport.go_home(false),
        }
    }
}

/// Converge the live camera on `intent`, skipping anything already there.
pub fn reconcile(viewport: &dyn Viewport, intent: &ViewportIntent) {
    let point = intent.point();
    if let Some(center) = point {
        let target = viewport.center_target();
        if round_half_up(center.x) != round_half_up(target.x)
            || round_half_up(center.y) != round_half_up(target.y)
        {
            viewport.pan_to(center, false);
        }
    }
    if let Some(zoom) = intent.zoom {
        if zoom != viewport.zoom_target() {
            viewport.zoom_to(zoom, point, false);
        }
    }
    if let Some(rotation) = intent.rotation {
        if rotation != viewport.rotation() {
            viewport.set_rotation(rotation);
        }
    }
    if let Some(flip) = intent.flip {
        if flip != viewport.flip() {
            viewport.set_flip(flip);
        }
    }
    if let Some(bounds) = intent.bounds {
        if !intent.has_point_or_zoom() && bounds == viewport.bounds() {
            viewport.fit_bounds(bounds, false);
        }
    }
}

/// Normalised snapshot of the live camera targets.
pub fn read_report(viewport: &dyn Viewport) -> ViewportReport {
    let center = viewport.center_target();
    ViewportReport {
        bounds: viewport.bounds(),
        flip: viewport.flip(),
        rotation: viewport.rotation(),
        x: round_half_up(center.x) as i64,
        y: round_half_up(center.y) as i64,
        zoom: viewport.zoom_target(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{EngineOptions, Point, Rect};
    use crate::sim::{DEFAULT_CONTAINER, EngineCall, SimEngine};

    fn engine() -> SimEngine {
        SimEngine::with_layout(
            EngineOptions::new(),
            Rect::new(0.0, 0.0, 1000.0, 1000.0),
            DEFAULT_CONTAINER,
        )
    }

    fn viewport_calls(engine: &SimEngine) -> Vec<EngineCall> {
        engine.journal().filter(EngineCall::is_viewport_call)
    }

    #[test]
    fn test_initial_bounds_fit_immediately() {
        let engine = engine();
        let bounds = Rect::new(2943.0, 1425.0, 1900.0, 1900.0);
        apply_initial(engine.sim_viewport(), &ViewportIntent::default().with_bounds(bounds));
        assert_eq!(
            viewport_calls(&engine),
            vec![EngineCall::FitBounds { rect: bounds, immediately: true }]
        );
    }

    #[test]
    fn test_initial_point_zoom_beats_bounds() {
        let engine = engine();
        let intent = ViewportIntent::default()
            .with_bounds(Rect::new(0.0, 0.0, 10.0, 10.0))
            .with_center(100.0, 200.0)
            .with_zoom(2.0);
        apply_initial(engine.sim_viewport(), &intent);

        let p = Point::new(100.0, 200.0);
        assert_eq!(
            viewport_calls(&engine),
            vec![
                EngineCall::PanTo { center: p, immediately: true },
                EngineCall::ZoomTo { zoom: 2.0, ref_point: Some(p), immediately: true },
            ]
        );
    }

    #[test]
    fn test_initial_without_intent_goes_home() {
        let engine = engine();
        apply_initial(engine.sim_viewport(), &ViewportIntent::default());
        assert_eq!(viewport_calls(&engine), vec![EngineCall::GoHome { immediately: false }]);
    }

    #[test]
    fn test_initial_zero_values_are_applied() {
        let engine = engine();
        let intent = ViewportIntent::default().with_center(0.0, 0.0).with_rotation(0.0);
        apply_initial(engine.sim_viewport(), &intent);
        // Rotation already 0: skipped. Point (0, 0) is declared: applied.
        assert_eq!(
            viewport_calls(&engine),
            vec![EngineCall::PanTo { center: Point::ZERO, immediately: true }]
        );
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let engine = engine();
        let intent = ViewportIntent::default()
            .with_center(300.0, 400.0)
            .with_zoom(3.0)
            .with_rotation(90.0)
            .with_flip(true);

        reconcile(engine.sim_viewport(), &intent);
        let first = viewport_calls(&engine).len();
        assert_eq!(first, 4);

        reconcile(engine.sim_viewport(), &intent);
        assert_eq!(viewport_calls(&engine).len(), first);
    }

    #[test]
    fn test_reconcile_compares_rounded_point() {
        let engine = engine();
        // Home center is (500, 500)
        reconcile(engine.sim_viewport(), &ViewportIntent::default().with_center(500.4, 499.6));
        assert!(viewport_calls(&engine).is_empty());

        reconcile(engine.sim_viewport(), &ViewportIntent::default().with_center(500.6, 500.0));
        assert_eq!(viewport_calls(&engine).len(), 1);
    }

    #[test]
    fn test_reconcile_half_point_ignored() {
        let engine = engine();
        let intent = ViewportIntent { x: Some(10.0), ..Default::default() };
        reconcile(engine.sim_viewport(), &intent);
        assert!(viewport_calls(&engine).is_empty());
    }

    #[test]
    fn test_reconcile_bounds_gate() {
        let engine = engine();
        let vp = engine.sim_viewport();

        // Different region: gated off
        reconcile(vp, &ViewportIntent::default().with_bounds(Rect::new(0.0, 0.0, 10.0, 10.0)));
        assert!(viewport_calls(&engine).is_empty());

        // Region equal to the live one: fit (animated)
        let live = vp.bounds();
        reconcile(vp, &ViewportIntent::default().with_bounds(live));
        assert_eq!(
            viewport_calls(&engine),
            vec![EngineCall::FitBounds { rect: live, immediately: false }]
        );

        // Zoom present: bounds ignored entirely
        engine.journal().clear();
        let zoom = vp.zoom_target();
        reconcile(vp, &ViewportIntent::default().with_bounds(live).with_zoom(zoom));
        assert!(viewport_calls(&engine).is_empty());
    }

    #[test]
    fn test_report_rounds_target_center() {
        let engine = engine();
        let vp = engine.sim_viewport();
        vp.pan_to(Point::new(100.6, 50.2), false);
        vp.zoom_to(1.5, None, false);

        let report = read_report(vp);
        assert_eq!(report.x, 101);
        assert_eq!(report.y, 50);
        assert_eq!(report.zoom, 1.5);
        assert!(!report.flip);
        assert_eq!(report.bounds, vp.bounds());
    }
}
