//! In-memory reference engine.
//!
//! Implements the full engine boundary without drawing anything. Every
//! mutating call lands in a shared [`Journal`]; events go through a
//! [`HandlerBus`] whose queue doubles as a record of raised events.
//!
//! Driver helpers (`open`, `finish_animation`, `resolve_loads`, `drag`,
//! `double_click`, `pointer_move`) stand in for the network, the animation
//! clock and the user.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use indexmap::IndexMap;
use log::{debug, trace};

use crate::core::HandlerBus;
use crate::entities::{
    Engine, EngineFactory, EngineOptions, EventKind, Handler, HandlerId, Point, PointerEvent,
    Rect, ViewerEvent, Viewport, World,
};

use super::journal::{EngineCall, Journal};
use super::viewport::{DEFAULT_CONTAINER, SimViewport};
use super::world::SimWorld;

/// Default home region (a unit square, like a normalised image width)
pub const DEFAULT_HOME: Rect = Rect::new(0.0, 0.0, 1.0, 1.0);

pub struct SimEngine {
    options: EngineOptions,
    bus: HandlerBus,
    viewport: SimViewport,
    world: SimWorld,
    journal: Journal,
    canvas_attributes: Mutex<IndexMap<String, String>>,
    destroyed: AtomicBool,
}

impl SimEngine {
    pub fn new(options: EngineOptions) -> Self {
        Self::with_layout(options, DEFAULT_HOME, DEFAULT_CONTAINER)
    }

    /// Engine whose home view is `home`, drawn into a `container` px canvas.
    pub fn with_layout(options: EngineOptions, home: Rect, container: Point) -> Self {
        let journal = Journal::new();
        let bus = HandlerBus::new();
        journal.record(EngineCall::Create { id: options.id().map(str::to_string) });
        Self {
            options,
            viewport: SimViewport::new(home, container, journal.clone(), bus.clone()),
            world: SimWorld::new(journal.clone()),
            bus,
            journal,
            canvas_attributes: Mutex::new(IndexMap::new()),
            destroyed: AtomicBool::new(false),
        }
    }

    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new(EngineOptions::new()))
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    pub fn bus(&self) -> &HandlerBus {
        &self.bus
    }

    pub fn sim_viewport(&self) -> &SimViewport {
        &self.viewport
    }

    pub fn sim_world(&self) -> &SimWorld {
        &self.world
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    pub fn canvas_attribute(&self, name: &str) -> Option<String> {
        self.canvas_attributes.lock().unwrap_or_else(|e| e.into_inner()).get(name).cloned()
    }

    /// Events raised since the last call.
    pub fn take_events(&self) -> Vec<ViewerEvent> {
        self.bus.poll()
    }

    // ========== Driver ==========

    /// First frame drawn: fires the initial viewport-change.
    pub fn open(&self) {
        debug!("SimEngine: open");
        self.raise_event(ViewerEvent::ViewportChange);
    }

    /// Settle the running animation and raise animation-finish.
    pub fn finish_animation(&self) {
        self.viewport.finish_animation();
        self.raise_event(ViewerEvent::AnimationFinish);
    }

    pub fn resolve_loads(&self) -> usize {
        self.world.resolve_loads()
    }

    pub fn resolve_next(&self) -> bool {
        self.world.resolve_next()
    }

    pub fn fail_source(&self, label: impl Into<String>) {
        self.world.fail_source(label);
    }

    /// User drag from `from` by `delta` pixels.
    pub fn drag(&self, from: Point, delta: Point) {
        self.raise_event(ViewerEvent::CanvasDrag { position: from });
        self.viewport.pan_by_pixels(delta);
        self.raise_event(ViewerEvent::CanvasDragEnd);
    }

    pub fn double_click(&self, position: Point, shift: bool) {
        self.raise_event(ViewerEvent::CanvasDoubleClick { position, shift });
    }

    pub fn pointer_move(&self, position: Point) {
        self.raise_event(ViewerEvent::CanvasMove(PointerEvent { position }));
    }
}

impl Engine for SimEngine {
    fn add_handler(&self, kind: EventKind, handler: Handler) -> HandlerId {
        self.journal.record(EngineCall::AddHandler(kind));
        self.bus.subscribe(kind, handler)
    }

    fn add_once_handler(&self, kind: EventKind, handler: Handler) -> HandlerId {
        self.journal.record(EngineCall::AddOnceHandler(kind));
        self.bus.subscribe_once(kind, handler)
    }

    fn remove_handler(&self, id: HandlerId) -> bool {
        self.journal.record(EngineCall::RemoveHandler(id));
        self.bus.unsubscribe(id)
    }

    fn remove_all_handlers(&self) {
        self.journal.record(EngineCall::RemoveAllHandlers);
        self.bus.clear_handlers();
    }

    fn raise_event(&self, event: ViewerEvent) {
        if self.is_destroyed() {
            trace!("SimEngine: destroyed, dropping {}", event.kind().name());
            return;
        }
        self.bus.emit(event);
    }

    fn viewport(&self) -> &dyn Viewport {
        &self.viewport
    }

    fn world(&self) -> &dyn World {
        &self.world
    }

    fn set_canvas_attribute(&self, name: &str, value: &str) {
        self.journal.record(EngineCall::SetCanvasAttribute {
            name: name.to_string(),
            value: value.to_string(),
        });
        self.canvas_attributes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name.to_string(), value.to_string());
    }

    fn destroy(&self) {
        self.journal.record(EngineCall::Destroy);
        self.destroyed.store(true, Ordering::SeqCst);
        self.bus.clear_handlers();
    }
}

/// Factory keeping every engine it built, for inspection.
pub struct SimFactory {
    engines: Mutex<Vec<Arc<SimEngine>>>,
    home: Rect,
    container: Point,
}

impl Default for SimFactory {
    fn default() -> Self {
        Self::with_layout(DEFAULT_HOME, DEFAULT_CONTAINER)
    }
}

impl SimFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_home(home: Rect) -> Self {
        Self::with_layout(home, DEFAULT_CONTAINER)
    }

    pub fn with_layout(home: Rect, container: Point) -> Self {
        Self { engines: Mutex::new(Vec::new()), home, container }
    }

    pub fn created(&self) -> usize {
        self.engines.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn last(&self) -> Option<Arc<SimEngine>> {
        self.engines.lock().unwrap_or_else(|e| e.into_inner()).last().cloned()
    }
}

impl EngineFactory for SimFactory {
    fn create(&self, options: &EngineOptions) -> Arc<dyn Engine> {
        let engine = Arc::new(SimEngine::with_layout(options.clone(), self.home, self.container));
        debug!("SimFactory: created engine {:?}", options.id());
        self.engines.lock().unwrap_or_else(|e| e.into_inner()).push(Arc::clone(&engine));
        engine
    }
}
