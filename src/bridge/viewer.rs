//! DeepZoomViewer - the declarative surface.
//!
//! Composes the lifecycle manager, viewport reconciler, interaction shim and
//! one layer controller per declared layer around a shared
//! [`ViewerRegistry`].
//!
//! # Usage
//! ```ignore
//! let mut viewer = DeepZoomViewer::new(Arc::new(factory));
//! viewer.on_update_viewport(|report| println!("{:?}", report));
//! viewer.mount(&props);
//!
//! // Every time the declared state changes:
//! viewer.render(&next_props);
//!
//! // In the host loop:
//! viewer.tick();
//! ```

use std::sync::Arc;
use std::time::Instant;

use indexmap::IndexMap;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::ViewerRegistry;
use crate::entities::{Engine, EngineFactory, EngineOptions, KeyedLayer, ViewportIntent, ViewportReport};

use super::interaction::Interaction;
use super::layer::LayerController;
use super::lifecycle::Lifecycle;
use super::reconciler::{Reconciler, ReportFn};

/// Everything the caller declares on one render.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewerProps {
    /// Engine construction options (read at mount only).
    pub osd_config: EngineOptions,
    pub viewer_config: ViewportIntent,
    /// Container style; `cursor` is always overridden.
    pub style: IndexMap<String, String>,
    /// Pass-through container attributes.
    pub attributes: IndexMap<String, String>,
    pub layers: Vec<KeyedLayer>,
}

/// Hosting element description: id, style and extra attributes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContainerProps {
    pub id: String,
    pub style: IndexMap<String, String>,
    pub attributes: IndexMap<String, String>,
}

pub struct DeepZoomViewer {
    identity: Uuid,
    factory: Arc<dyn EngineFactory>,
    registry: ViewerRegistry,
    lifecycle: Lifecycle,
    reconciler: Reconciler,
    interaction: Interaction,
    layers: IndexMap<String, LayerController>,
    props: ViewerProps,
}

impl DeepZoomViewer {
    pub fn new(factory: Arc<dyn EngineFactory>) -> Self {
        Self::with_identity(factory, Uuid::new_v4())
    }

    pub fn with_identity(factory: Arc<dyn EngineFactory>, identity: Uuid) -> Self {
        let registry = ViewerRegistry::new();
        Self {
            identity,
            factory,
            lifecycle: Lifecycle::new(registry.clone()),
            registry,
            reconciler: Reconciler::new(),
            interaction: Interaction::new(),
            layers: IndexMap::new(),
            props: ViewerProps::default(),
        }
    }

    pub fn identity(&self) -> Uuid {
        self.identity
    }

    /// Shared handle slot, for collaborators outside the layer tree.
    pub fn registry(&self) -> &ViewerRegistry {
        &self.registry
    }

    /// Live engine, if mounted.
    pub fn engine(&self) -> Option<Arc<dyn Engine>> {
        self.registry
            .current()
            .filter(|h| h.is_live())
            .map(|h| Arc::clone(h.engine()))
    }

    pub fn is_mounted(&self) -> bool {
        self.lifecycle.is_mounted()
    }

    pub fn layer(&self, key: &str) -> Option<&LayerController> {
        self.layers.get(key)
    }

    pub fn layer_keys(&self) -> impl Iterator<Item = &str> {
        self.layers.keys().map(String::as_str)
    }

    /// Viewport report callback; replaces any previous one.
    pub fn on_update_viewport<F>(&self, callback: F)
    where
        F: Fn(ViewportReport) + Send + Sync + 'static,
    {
        let callback: ReportFn = Arc::new(callback);
        self.reconciler.set_report_callback(Some(callback));
    }

    pub fn clear_update_viewport(&self) {
        self.reconciler.set_report_callback(None);
    }

    /// Create the engine (once per identity), then render `props`.
    pub fn mount(&mut self, props: &ViewerProps) {
        let reconciler = self.reconciler.clone();
        let interaction = self.interaction.clone();
        let zoom_ratio = props.osd_config.zoom_per_double_click();

        self.lifecycle.mount(self.identity, self.factory.as_ref(), &props.osd_config, |bindings| {
            interaction.install(bindings, zoom_ratio);
            reconciler.install(bindings);
        });
        // Layers could not attach before the handle existed
        self.render(props);
    }

    /// Push a new declared state through the bridge.
    pub fn render(&mut self, props: &ViewerProps) {
        let viewer = self.registry.current();
        if self.reconciler.update(viewer.as_ref(), &props.viewer_config) {
            debug!("Viewer {}: viewport reconciled", self.identity);
        }

        // Removed keys first, so replacements never overlap their predecessors
        let declared: Vec<&str> = props.layers.iter().map(|l| l.key.as_str()).collect();
        let stale: Vec<String> =
            self.layers.keys().filter(|k| !declared.contains(&k.as_str())).cloned().collect();
        for key in stale {
            if let Some(mut layer) = self.layers.shift_remove(&key) {
                layer.detach();
            }
        }

        for keyed in &props.layers {
            self.layers
                .entry(keyed.key.clone())
                .or_insert_with(|| LayerController::new(keyed.key.clone()))
                .sync(&self.registry, &keyed.spec);
        }

        self.props = props.clone();
    }

    /// Flush the debounced pointer relay.
    pub fn tick(&self) -> bool {
        self.interaction.tick()
    }

    pub fn tick_at(&self, now: Instant) -> bool {
        self.interaction.tick_at(now)
    }

    pub fn cursor(&self) -> &'static str {
        self.interaction.cursor()
    }

    pub fn container_props(&self) -> ContainerProps {
        let mut style = self.props.style.clone();
        style.insert("cursor".to_string(), self.cursor().to_string());
        ContainerProps {
            id: self.identity.to_string(),
            style,
            attributes: self.props.attributes.clone(),
        }
    }

    /// Tear everything down. Safe to call more than once.
    pub fn unmount(&mut self) {
        for (_, mut layer) in self.layers.drain(..) {
            layer.detach();
        }
        self.interaction.detach();
        if self.lifecycle.unmount() {
            self.reconciler.reset();
        }
    }

    /// Unmount, switch to `identity` and mount again with the last props.
    pub fn remount(&mut self, identity: Uuid) {
        info!("Viewer {}: remounting as {}", self.identity, identity);
        self.unmount();
        self.identity = identity;
        let props = self.props.clone();
        self.mount(&props);
    }
}

impl Drop for DeepZoomViewer {
    fn drop(&mut self) {
        self.unmount();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{LayerSpec, Point, Rect, TileSource, TiledImage, Viewport, World};
    use crate::sim::{EngineCall, SimEngine, SimFactory};
    use std::sync::Mutex;
    use std::time::Duration;

    fn setup() -> (Arc<SimFactory>, DeepZoomViewer, Arc<Mutex<Vec<ViewportReport>>>) {
        let factory = Arc::new(SimFactory::with_home(Rect::new(0.0, 0.0, 1000.0, 1000.0)));
        let viewer = DeepZoomViewer::new(factory.clone());
        let reports = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&reports);
        viewer.on_update_viewport(move |r| sink.lock().unwrap().push(r));
        (factory, viewer, reports)
    }

    fn props(intent: ViewportIntent) -> ViewerProps {
        ViewerProps { viewer_config: intent, ..Default::default() }
    }

    fn count(engine: &SimEngine, pred: impl Fn(&EngineCall) -> bool) -> usize {
        engine.journal().count(pred)
    }

    fn fit_bounds_calls(engine: &SimEngine) -> Vec<EngineCall> {
        engine.journal().filter(|c| matches!(c, EngineCall::FitBounds { .. }))
    }

    #[test]
    fn test_bounds_scenario_single_fit() {
        let (factory, mut viewer, _reports) = setup();
        let bounds = Rect::new(2943.0, 1425.0, 1900.0, 1900.0);
        let p = props(ViewportIntent::default().with_bounds(bounds));
        viewer.mount(&p);
        let engine = factory.last().unwrap();
        assert!(fit_bounds_calls(&engine).is_empty());

        engine.open();
        assert_eq!(
            fit_bounds_calls(&engine),
            vec![EngineCall::FitBounds { rect: bounds, immediately: true }]
        );

        // Re-renders with an equal value, user animations: nothing new
        viewer.render(&p.clone());
        engine.finish_animation();
        engine.drag(Point::new(10.0, 10.0), Point::new(30.0, 0.0));
        engine.finish_animation();
        viewer.render(&p);
        // Changed bounds while the live region differs: gated
        viewer.render(&props(ViewportIntent::default().with_bounds(Rect::new(0.0, 0.0, 5.0, 5.0))));
        assert_eq!(fit_bounds_calls(&engine).len(), 1);

        // Changed to the live region: fit once, equal re-render stays quiet
        let live = engine.sim_viewport().bounds();
        let q = props(ViewportIntent::default().with_bounds(live));
        viewer.render(&q);
        viewer.render(&q.clone());
        assert_eq!(fit_bounds_calls(&engine).len(), 2);
    }

    #[test]
    fn test_initial_handler_fires_once_with_latest_intent() {
        let (factory, mut viewer, _reports) = setup();
        viewer.mount(&props(ViewportIntent::default().with_center(10.0, 10.0)));
        // Declared again before the engine's first frame
        viewer.render(&props(ViewportIntent::default().with_center(20.0, 30.0)));
        let engine = factory.last().unwrap();

        engine.open();
        engine.open();
        assert_eq!(
            engine.journal().filter(|c| matches!(c, EngineCall::PanTo { .. })),
            vec![EngineCall::PanTo { center: Point::new(20.0, 30.0), immediately: true }]
        );
    }

    #[test]
    fn test_reconcile_only_changed_fields() {
        let (factory, mut viewer, _reports) = setup();
        viewer.mount(&props(ViewportIntent::default()));
        let engine = factory.last().unwrap();
        engine.open();
        engine.journal().clear();

        let intent = ViewportIntent::default().with_center(100.0, 200.0).with_zoom(2.0);
        viewer.render(&props(intent.clone()));
        let after_first = engine.journal().filter(EngineCall::is_viewport_call).len();
        assert_eq!(after_first, 2);

        viewer.render(&props(intent.clone()));
        viewer.render(&props(intent.clone().with_rotation(0.0)));
        assert_eq!(engine.journal().filter(EngineCall::is_viewport_call).len(), after_first);

        viewer.render(&props(intent.with_rotation(90.0)));
        assert_eq!(
            engine.journal().filter(EngineCall::is_viewport_call).last(),
            Some(&EngineCall::SetRotation(90.0))
        );
    }

    #[test]
    fn test_same_intent_after_drag_pans_back() {
        let (factory, mut viewer, _reports) = setup();
        let p = props(ViewportIntent::default().with_center(100.0, 100.0));
        viewer.mount(&p);
        let engine = factory.last().unwrap();
        engine.open();
        engine.drag(Point::new(250.0, 250.0), Point::new(100.0, 0.0));
        engine.finish_animation();
        assert_ne!(engine.sim_viewport().center_target(), Point::new(100.0, 100.0));

        // Report not echoed: the caller declares the old value again
        engine.journal().clear();
        viewer.render(&p.clone());
        assert_eq!(
            engine.journal().filter(EngineCall::is_viewport_call),
            vec![EngineCall::PanTo { center: Point::new(100.0, 100.0), immediately: false }]
        );
        assert_eq!(engine.sim_viewport().center_target(), Point::new(100.0, 100.0));

        viewer.render(&p);
        assert_eq!(engine.journal().filter(EngineCall::is_viewport_call).len(), 1);
    }

    #[test]
    fn test_point_zoom_precedence_over_bounds() {
        let (factory, mut viewer, _reports) = setup();
        viewer.mount(&props(ViewportIntent::default()));
        let engine = factory.last().unwrap();
        engine.open();

        let live = engine.sim_viewport().bounds();
        let intent = ViewportIntent::default().with_bounds(live).with_center(1.0, 2.0).with_zoom(4.0);
        viewer.render(&props(intent));
        assert!(fit_bounds_calls(&engine).is_empty());
        assert_eq!(engine.sim_viewport().zoom_target(), 4.0);
    }

    #[test]
    fn test_report_round_trip_is_quiet() {
        let (factory, mut viewer, reports) = setup();
        viewer.mount(&props(ViewportIntent::default()));
        let engine = factory.last().unwrap();
        engine.open();

        engine.sim_viewport().pan_to(Point::new(100.6, 50.2), false);
        engine.finish_animation();
        let report = *reports.lock().unwrap().last().unwrap();
        assert_eq!((report.x, report.y), (101, 50));

        // Caller echoes the report back as its new intent
        engine.journal().clear();
        let echoed = ViewportIntent::default()
            .with_center(report.x as f64, report.y as f64)
            .with_zoom(report.zoom)
            .with_rotation(report.rotation)
            .with_flip(report.flip);
        viewer.render(&props(echoed));
        assert!(engine.journal().filter(EngineCall::is_viewport_call).is_empty());
    }

    #[test]
    fn test_report_callback_swapped() {
        let (factory, mut viewer, first) = setup();
        viewer.mount(&props(ViewportIntent::default()));
        let engine = factory.last().unwrap();
        engine.open();
        engine.finish_animation();

        let second = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&second);
        viewer.on_update_viewport(move |r| sink.lock().unwrap().push(r));
        engine.finish_animation();

        assert_eq!(first.lock().unwrap().len(), 1);
        assert_eq!(second.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_fit_bounds_layer_scenario() {
        let (factory, mut viewer, _reports) = setup();
        let rect = Rect::new(0.0, 0.0, 8272.0, 6128.0);
        let spec = LayerSpec::new(TileSource::Url("https://iiif.example/info.json".into()))
            .with_fit_bounds(rect);
        let p = ViewerProps { layers: vec![KeyedLayer::new("page", spec)], ..Default::default() };
        viewer.mount(&p);
        let engine = factory.last().unwrap();
        engine.open();
        engine.resolve_loads();
        viewer.render(&p);

        let adds = engine.journal().filter(|c| matches!(c, EngineCall::AddTiledImage { .. }));
        assert_eq!(adds.len(), 1);
        let EngineCall::AddTiledImage { fit_bounds, .. } = &adds[0] else { unreachable!() };
        assert_eq!(*fit_bounds, Some(rect));
        assert!(viewer.layer("page").unwrap().image().is_some());
        assert_eq!(engine.sim_world().item_count(), 1);
        assert_eq!(count(&engine, |c| matches!(c, EngineCall::RemoveItem(_))), 0);

        viewer.unmount();
        let calls = engine.journal().calls();
        let remove = calls.iter().position(|c| matches!(c, EngineCall::RemoveItem(_))).unwrap();
        let destroy = calls.iter().position(|c| *c == EngineCall::Destroy).unwrap();
        assert!(remove < destroy);
        assert_eq!(count(&engine, |c| matches!(c, EngineCall::Destroy)), 1);
    }

    #[test]
    fn test_create_remove_create_order() {
        let (factory, mut viewer, _reports) = setup();
        let with_layer = |url: &str| ViewerProps {
            layers: vec![KeyedLayer::new("img", LayerSpec::from_url(url))],
            ..Default::default()
        };
        viewer.mount(&with_layer("a.png"));
        let engine = factory.last().unwrap();
        engine.resolve_loads();

        viewer.render(&ViewerProps::default());
        viewer.render(&with_layer("b.png"));
        engine.resolve_loads();

        let world: Vec<_> = engine
            .journal()
            .filter(|c| matches!(c, EngineCall::AddTiledImage { .. } | EngineCall::RemoveItem(_)));
        assert_eq!(world.len(), 3);
        assert!(matches!(
            &world[0],
            EngineCall::AddTiledImage { tile_source, .. } if *tile_source == TileSource::image("a.png")
        ));
        assert!(matches!(world[1], EngineCall::RemoveItem(_)));
        assert!(matches!(
            &world[2],
            EngineCall::AddTiledImage { tile_source, .. } if *tile_source == TileSource::image("b.png")
        ));
    }

    #[test]
    fn test_unmount_with_inflight_layer() {
        let (factory, mut viewer, _reports) = setup();
        let p = ViewerProps {
            layers: vec![KeyedLayer::new("slow", LayerSpec::from_url("slow.png"))],
            ..Default::default()
        };
        viewer.mount(&p);
        let engine = factory.last().unwrap();

        viewer.unmount();
        assert!(viewer.engine().is_none());
        assert!(!engine.is_destroyed());
        assert_eq!(engine.bus().handler_count(), 0);

        engine.resolve_loads();
        let calls = engine.journal().calls();
        let n = calls.len();
        assert!(matches!(calls[n - 2], EngineCall::RemoveItem(_)));
        assert_eq!(calls[n - 1], EngineCall::Destroy);
        assert_eq!(engine.sim_world().item_count(), 0);

        // Second unmount is a no-op
        viewer.unmount();
        assert_eq!(count(&engine, |c| matches!(c, EngineCall::Destroy)), 1);
    }

    #[test]
    fn test_container_props_and_cursor() {
        let (factory, mut viewer, _reports) = setup();
        let mut p = ViewerProps::default();
        p.style.insert("height".into(), "400px".into());
        p.style.insert("cursor".into(), "crosshair".into());
        p.attributes.insert("aria-label".into(), "Scan".into());
        viewer.mount(&p);
        let engine = factory.last().unwrap();

        let container = viewer.container_props();
        assert_eq!(container.id, viewer.identity().to_string());
        assert_eq!(container.style.get("cursor").map(String::as_str), Some("grab"));
        assert_eq!(container.style.get("height").map(String::as_str), Some("400px"));
        assert_eq!(container.attributes.get("aria-label").map(String::as_str), Some("Scan"));

        engine.raise_event(crate::entities::ViewerEvent::CanvasDrag { position: Point::ZERO });
        assert_eq!(viewer.container_props().style["cursor"], "grabbing");
        assert_eq!(engine.options().id(), Some(container.id.as_str()));
        assert_eq!(engine.canvas_attribute("role").as_deref(), Some("img"));
    }

    #[test]
    fn test_mouse_move_relay_stops_after_unmount() {
        let (factory, mut viewer, _reports) = setup();
        viewer.mount(&ViewerProps::default());
        let engine = factory.last().unwrap();

        engine.pointer_move(Point::new(3.0, 4.0));
        let later = Instant::now() + Duration::from_millis(50);
        assert!(viewer.tick_at(later));

        engine.pointer_move(Point::new(5.0, 6.0));
        viewer.unmount();
        assert!(!viewer.tick_at(later + Duration::from_millis(50)));
    }

    #[test]
    fn test_remount_builds_new_engine() {
        let (factory, mut viewer, _reports) = setup();
        let p = ViewerProps {
            layers: vec![KeyedLayer::new("a", LayerSpec::from_url("a.png"))],
            ..Default::default()
        };
        viewer.mount(&p);
        let first = factory.last().unwrap();
        first.resolve_loads();

        viewer.remount(Uuid::new_v4());
        let second = factory.last().unwrap();
        assert_eq!(factory.created(), 2);
        assert!(first.is_destroyed());
        assert_eq!(count(&second, |c| matches!(c, EngineCall::AddTiledImage { .. })), 1);
        assert!(viewer.engine().is_some());
    }

    #[test]
    fn test_reparsed_props_update_layer_in_place() {
        let (factory, mut viewer, _reports) = setup();
        let parse = |opacity: f64| -> ViewerProps {
            serde_json::from_value(serde_json::json!({
                "layers": [ { "key": "page", "tileSource": "https://x/info.json", "opacity": opacity } ]
            }))
            .unwrap()
        };
        viewer.mount(&parse(1.0));
        let engine = factory.last().unwrap();
        engine.resolve_loads();
        let id = viewer.layer("page").unwrap().image().unwrap().id();

        viewer.render(&parse(0.5));
        engine.resolve_loads();

        assert_eq!(count(&engine, |c| matches!(c, EngineCall::AddTiledImage { .. })), 1);
        assert_eq!(count(&engine, |c| matches!(c, EngineCall::RemoveItem(_))), 0);
        assert_eq!(
            engine.journal().filter(|c| matches!(c, EngineCall::SetOpacity { .. })),
            vec![EngineCall::SetOpacity { item: id, opacity: 0.5 }]
        );
    }

    #[test]
    fn test_props_from_json() {
        let json = r#"{
            "osdConfig": { "zoomPerDoubleClick": 2 },
            "viewerConfig": { "bounds": [2943, 1425, 1900, 1900] },
            "layers": [ { "key": "p1", "url": "https://example.org/p1.jpg", "opacity": 0.8 } ]
        }"#;
        let props: ViewerProps = serde_json::from_str(json).unwrap();
        assert_eq!(props.osd_config.zoom_per_double_click(), Some(2.0));
        assert_eq!(props.viewer_config.bounds, Some(Rect::new(2943.0, 1425.0, 1900.0, 1900.0)));
        assert_eq!(props.layers[0].spec.opacity, Some(0.8));
    }
}
