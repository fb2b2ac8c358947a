//! Lifecycle manager - creates and tears down the engine instance.
//!
//! One engine per mount identity:
//! - `mount()` merges options over defaults, constructs the engine, tags the
//!   canvas, installs the handler set and publishes the handle
//! - `unmount()` clears the registry, removes every handler and requests
//!   destroy (deferred while image creations are in flight)
//!
//! Handlers are installed before the handle is published, so nothing can
//! observe a live engine without its bindings.

use std::sync::{Arc, Weak};

use log::{debug, info, trace, warn};
use uuid::Uuid;

use crate::core::{ViewerHandle, ViewerRegistry};
use crate::entities::{Engine, EngineFactory, EngineOptions, EventKind, HandlerId, ViewerEvent};

/// Attribute set on the engine canvas after construction.
pub const CANVAS_ROLE: (&str, &str) = ("role", "img");

/// Handler subscriptions owned by one live engine.
///
/// Handlers should capture [`HandlerBindings::engine`] (a weak pointer),
/// never the engine itself, or engine and handler keep each other alive.
pub struct HandlerBindings {
    engine: Arc<dyn Engine>,
    ids: Vec<HandlerId>,
}

impl HandlerBindings {
    fn new(engine: Arc<dyn Engine>) -> Self {
        Self { engine, ids: Vec::new() }
    }

    pub fn engine(&self) -> Weak<dyn Engine> {
        Arc::downgrade(&self.engine)
    }

    pub fn on<F>(&mut self, kind: EventKind, handler: F) -> HandlerId
    where
        F: Fn(&ViewerEvent) + Send + Sync + 'static,
    {
        let id = self.engine.add_handler(kind, Arc::new(handler));
        self.ids.push(id);
        id
    }

    /// Handler dropped after its first invocation.
    pub fn once<F>(&mut self, kind: EventKind, handler: F) -> HandlerId
    where
        F: Fn(&ViewerEvent) + Send + Sync + 'static,
    {
        let id = self.engine.add_once_handler(kind, Arc::new(handler));
        self.ids.push(id);
        id
    }

    pub fn ids(&self) -> &[HandlerId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    fn release(self) {
        for id in &self.ids {
            // Fired once-handlers are already gone
            if !self.engine.remove_handler(*id) {
                trace!("Handler {:?} already removed", id);
            }
        }
        self.engine.remove_all_handlers();
    }
}

struct LiveViewer {
    handle: ViewerHandle,
    bindings: HandlerBindings,
}

/// Sole writer of the [`ViewerRegistry`].
pub struct Lifecycle {
    registry: ViewerRegistry,
    live: Option<LiveViewer>,
}

impl Lifecycle {
    pub fn new(registry: ViewerRegistry) -> Self {
        Self { registry, live: None }
    }

    pub fn registry(&self) -> &ViewerRegistry {
        &self.registry
    }

    pub fn is_mounted(&self) -> bool {
        self.live.is_some()
    }

    pub fn identity(&self) -> Option<Uuid> {
        self.live.as_ref().map(|l| l.handle.identity())
    }

    pub fn handle(&self) -> Option<&ViewerHandle> {
        self.live.as_ref().map(|l| &l.handle)
    }

    /// Number of handlers installed on the live engine.
    pub fn binding_count(&self) -> usize {
        self.live.as_ref().map(|l| l.bindings.len()).unwrap_or(0)
    }

    /// Construct the engine for `identity` unless it already exists.
    ///
    /// A different identity tears the current engine down first.
    pub fn mount<F>(
        &mut self,
        identity: Uuid,
        factory: &dyn EngineFactory,
        options: &EngineOptions,
        install: F,
    ) -> ViewerHandle
    where
        F: FnOnce(&mut HandlerBindings),
    {
        if let Some(live) = &self.live {
            if live.handle.identity() == identity {
                debug!("Viewer {}: already mounted", identity);
                return live.handle.clone();
            }
            self.unmount();
        }

        let merged = options.merged_over_defaults(&identity.to_string());
        let engine = factory.create(&merged);
        engine.set_canvas_attribute(CANVAS_ROLE.0, CANVAS_ROLE.1);

        let mut bindings = HandlerBindings::new(Arc::clone(&engine));
        install(&mut bindings);

        let handle = ViewerHandle::new(engine, identity);
        self.registry.publish(handle.clone());
        info!("Viewer {}: mounted with {} handler(s)", identity, bindings.len());

        self.live = Some(LiveViewer { handle: handle.clone(), bindings });
        handle
    }

    /// Tear the live engine down. Returns false if nothing was mounted.
    pub fn unmount(&mut self) -> bool {
        let Some(live) = self.live.take() else {
            return false;
        };
        self.registry.clear();
        live.bindings.release();
        if !live.handle.request_destroy() {
            warn!(
                "Viewer {}: destroy pending until {} image load(s) settle",
                live.handle.identity(),
                live.handle.inflight()
            );
        }
        info!("Viewer {}: unmounted", live.handle.identity());
        true
    }
}

impl Drop for Lifecycle {
    fn drop(&mut self) {
        self.unmount();
    }
}
