//! Viewer handle registry - shared rendezvous for the live engine instance.
//!
//! The lifecycle manager is the only writer: it publishes a [`ViewerHandle`]
//! after construction and clears it on teardown. Layer controllers and the
//! reconciler only read it. A revision counter bumps on every publish/clear
//! so readers can tell that the instance they attached to went away.
//!
//! # Deferred destroy
//!
//! Layers may still have image creations in flight when the viewer is torn
//! down. Each creation holds a [`CreationGuard`]; the engine's `destroy()`
//! runs when destroy has been requested AND the last guard is released, so
//! a late-resolving creation can still remove its image before the engine
//! goes away. `destroy()` runs at most once.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use log::{debug, trace};
use uuid::Uuid;

use crate::entities::Engine;

struct HandleInner {
    engine: Arc<dyn Engine>,
    identity: Uuid,
    inflight: AtomicUsize,
    destroy_requested: AtomicBool,
    destroyed: AtomicBool,
}

/// Read-only capability over one live engine instance.
///
/// Cheap to clone; clones share teardown state.
#[derive(Clone)]
pub struct ViewerHandle {
    inner: Arc<HandleInner>,
}

impl std::fmt::Debug for ViewerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewerHandle")
            .field("identity", &self.inner.identity)
            .field("inflight", &self.inflight())
            .field("destroy_requested", &self.is_destroy_requested())
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

impl ViewerHandle {
    pub(crate) fn new(engine: Arc<dyn Engine>, identity: Uuid) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                engine,
                identity,
                inflight: AtomicUsize::new(0),
                destroy_requested: AtomicBool::new(false),
                destroyed: AtomicBool::new(false),
            }),
        }
    }

    pub fn engine(&self) -> &Arc<dyn Engine> {
        &self.inner.engine
    }

    /// Mount identity the instance was created for.
    pub fn identity(&self) -> Uuid {
        self.inner.identity
    }

    /// True if both handles refer to the same engine instance.
    pub fn same_instance(&self, other: &ViewerHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Instance is usable for new work (teardown not started).
    pub fn is_live(&self) -> bool {
        !self.is_destroy_requested()
    }

    pub fn is_destroy_requested(&self) -> bool {
        self.inner.destroy_requested.load(Ordering::SeqCst)
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.load(Ordering::SeqCst)
    }

    /// Image creations not yet settled.
    pub fn inflight(&self) -> usize {
        self.inner.inflight.load(Ordering::SeqCst)
    }

    /// Register an in-flight creation; destroy waits for the guard.
    pub fn begin_creation(&self) -> CreationGuard {
        self.inner.inflight.fetch_add(1, Ordering::SeqCst);
        CreationGuard { handle: self.clone() }
    }

    /// Request teardown. Destroys now if nothing is in flight.
    ///
    /// Returns true if the engine was destroyed by this call.
    pub(crate) fn request_destroy(&self) -> bool {
        if self.inner.destroy_requested.swap(true, Ordering::SeqCst) {
            return false;
        }
        let pending = self.inflight();
        if pending == 0 {
            self.destroy_now()
        } else {
            debug!("Viewer {}: destroy deferred, {} creation(s) in flight", self.identity(), pending);
            false
        }
    }

    fn destroy_now(&self) -> bool {
        if self.inner.destroyed.swap(true, Ordering::SeqCst) {
            return false;
        }
        debug!("Viewer {}: destroying engine", self.identity());
        self.inner.engine.destroy();
        true
    }
}

/// Marks one image creation as in flight until dropped.
#[must_use = "dropping the guard settles the creation immediately"]
pub struct CreationGuard {
    handle: ViewerHandle,
}

impl Drop for CreationGuard {
    fn drop(&mut self) {
        let left = self.handle.inner.inflight.fetch_sub(1, Ordering::SeqCst) - 1;
        if left == 0 && self.handle.is_destroy_requested() {
            self.handle.destroy_now();
        }
    }
}

/// Shared cell holding the current viewer (or none).
///
/// Passed by reference/clone to every descendant; clones share the slot.
#[derive(Clone, Default)]
pub struct ViewerRegistry {
    slot: Arc<RwLock<Option<ViewerHandle>>>,
    revision: Arc<AtomicU64>,
}

impl ViewerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<ViewerHandle> {
        self.slot.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn is_available(&self) -> bool {
        self.slot.read().unwrap_or_else(|e| e.into_inner()).is_some()
    }

    /// Bumped on every publish/clear.
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::SeqCst)
    }

    pub(crate) fn publish(&self, handle: ViewerHandle) {
        trace!("ViewerRegistry: publish {}", handle.identity());
        *self.slot.write().unwrap_or_else(|e| e.into_inner()) = Some(handle);
        self.revision.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn clear(&self) -> Option<ViewerHandle> {
        let prev = self.slot.write().unwrap_or_else(|e| e.into_inner()).take();
        if prev.is_some() {
            trace!("ViewerRegistry: cleared");
            self.revision.fetch_add(1, Ordering::SeqCst);
        }
        prev
    }
}
