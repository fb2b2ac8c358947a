//! Layer controller - one engine-side image per declared layer.
//!
//! # Lifecycle
//!
//! ```text
//!   sync() with live viewer         success                detach()
//!   ──────────────────────> Pending ───────> Ready(image) ─────────> removed now
//!                              │  └─ error ─> Failed (logged, no-op on detach)
//!                              └─ detach() ─> Pending{detach} ──success──> removed on arrival
//! ```
//!
//! Creation holds a [`CreationGuard`] on the viewer handle until it
//! settles, so a viewer torn down mid-creation is only destroyed after the
//! late image has been removed again.
//!
//! Props (opacity, fit-region, index) are applied in place. A new source
//! identity or a new viewer instance detaches and creates from scratch.

use std::sync::{Arc, Mutex};

use log::{debug, error, trace};

use crate::core::{CreationGuard, ViewerHandle, ViewerRegistry};
use crate::entities::{AddImageRequest, ImageHandle, LayerSpec, LoadError, TiledImage};

enum ImageState {
    Pending { detach_requested: bool },
    Ready(ImageHandle),
    Failed,
    Removed,
}

struct Slot {
    image: ImageState,
    /// Latest declared props, applied when a pending creation lands
    desired: LayerSpec,
}

type SharedSlot = Arc<Mutex<Slot>>;
type Ticket = Arc<Mutex<Option<CreationGuard>>>;

struct Attachment {
    viewer: ViewerHandle,
    /// Props the image was created with
    created_with: LayerSpec,
    slot: SharedSlot,
}

/// Keeps one declared layer in sync with the engine's world.
pub struct LayerController {
    key: String,
    declared: Option<LayerSpec>,
    attachment: Option<Attachment>,
}

impl LayerController {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into(), declared: None, attachment: None }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn spec(&self) -> Option<&LayerSpec> {
        self.declared.as_ref()
    }

    /// Image handle, once creation succeeded.
    pub fn image(&self) -> Option<ImageHandle> {
        let attachment = self.attachment.as_ref()?;
        match &lock(&attachment.slot).image {
            ImageState::Ready(image) => Some(Arc::clone(image)),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.attachment
            .as_ref()
            .map(|a| matches!(lock(&a.slot).image, ImageState::Pending { .. }))
            .unwrap_or(false)
    }

    pub fn is_attached(&self) -> bool {
        self.attachment.is_some()
    }

    /// Apply `spec` against whatever viewer `registry` currently holds.
    pub fn sync(&mut self, registry: &ViewerRegistry, spec: &LayerSpec) {
        let previous = self.declared.replace(spec.clone());
        let current = registry.current().filter(ViewerHandle::is_live);

        let reattach = match (&self.attachment, &current) {
            (Some(a), Some(viewer)) => {
                !a.viewer.same_instance(viewer) || !a.created_with.same_source(spec)
            }
            (Some(_), None) => true,
            (None, Some(_)) => true,
            (None, None) => false,
        };

        if reattach {
            self.detach();
            if let Some(viewer) = current {
                self.attach(viewer, spec.clone());
            }
            return;
        }

        if let Some(a) = &self.attachment {
            update_props(a, previous.as_ref(), spec);
        }
    }

    fn attach(&mut self, viewer: ViewerHandle, spec: LayerSpec) {
        let slot: SharedSlot = Arc::new(Mutex::new(Slot {
            image: ImageState::Pending { detach_requested: false },
            desired: spec.clone(),
        }));
        let ticket: Ticket = Arc::new(Mutex::new(Some(viewer.begin_creation())));
        let tile_source = spec.engine_source();
        let label = tile_source.describe();
        debug!("Layer {}: adding {}", self.key, label);

        let success = {
            let slot = Arc::clone(&slot);
            let ticket = Arc::clone(&ticket);
            let viewer = viewer.clone();
            let created_with = spec.clone();
            let key = self.key.clone();
            move |image: ImageHandle| {
                on_loaded(&key, &viewer, &slot, &created_with, image);
                settle(&ticket);
            }
        };
        let failure = {
            let slot = Arc::clone(&slot);
            let ticket = Arc::clone(&ticket);
            move |e: LoadError| {
                error!("Error loading tile source {}: {}", label, e);
                lock(&slot).image = ImageState::Failed;
                settle(&ticket);
            }
        };

        let request = AddImageRequest {
            tile_source,
            index: spec.index,
            opacity: spec.opacity,
            fit_bounds: spec.fit_bounds,
            success: Box::new(success),
            error: Box::new(failure),
        };
        self.attachment = Some(Attachment { viewer: viewer.clone(), created_with: spec, slot });
        viewer.engine().world().add_tiled_image(request);
    }

    /// Remove the image now, or as soon as its creation settles.
    pub fn detach(&mut self) {
        let Some(a) = self.attachment.take() else {
            return;
        };
        let ready = {
            let mut slot = lock(&a.slot);
            match std::mem::replace(&mut slot.image, ImageState::Removed) {
                ImageState::Pending { .. } => {
                    trace!("Layer {}: removal deferred until load settles", self.key);
                    slot.image = ImageState::Pending { detach_requested: true };
                    None
                }
                ImageState::Ready(image) => Some(image),
                ImageState::Failed | ImageState::Removed => None,
            }
        };
        if let Some(image) = ready {
            remove_image(&self.key, &a.viewer, image.as_ref());
        }
    }
}

impl Drop for LayerController {
    fn drop(&mut self) {
        self.detach();
    }
}

fn lock(slot: &SharedSlot) -> std::sync::MutexGuard<'_, Slot> {
    slot.lock().unwrap_or_else(|e| e.into_inner())
}

fn settle(ticket: &Ticket) {
    let guard = ticket.lock().unwrap_or_else(|e| e.into_inner()).take();
    drop(guard);
}

fn remove_image(key: &str, viewer: &ViewerHandle, image: &dyn TiledImage) {
    if viewer.is_destroyed() {
        trace!("Layer {}: viewer gone, nothing to remove", key);
        return;
    }
    debug!("Layer {}: removing {}", key, image.id());
    viewer.engine().world().remove_item(image);
}

fn on_loaded(
    key: &str,
    viewer: &ViewerHandle,
    slot: &SharedSlot,
    created_with: &LayerSpec,
    image: ImageHandle,
) {
    let desired = {
        let mut slot = lock(slot);
        if matches!(slot.image, ImageState::Pending { detach_requested: true }) {
            slot.image = ImageState::Removed;
            None
        } else {
            slot.image = ImageState::Ready(Arc::clone(&image));
            Some(slot.desired.clone())
        }
    };
    match desired {
        None => remove_image(key, viewer, image.as_ref()),
        Some(desired) => {
            debug!("Layer {}: loaded as {}", key, image.id());
            apply_props(viewer, image.as_ref(), Some(created_with), &desired);
        }
    }
}

fn update_props(a: &Attachment, previous: Option<&LayerSpec>, spec: &LayerSpec) {
    let image = {
        let mut slot = lock(&a.slot);
        slot.desired = spec.clone();
        match &slot.image {
            ImageState::Ready(image) => Arc::clone(image),
            _ => return,
        }
    };
    apply_props(&a.viewer, image.as_ref(), previous, spec);
}

/// Push props that differ from `previous` onto the image.
fn apply_props(
    viewer: &ViewerHandle,
    image: &dyn TiledImage,
    previous: Option<&LayerSpec>,
    spec: &LayerSpec,
) {
    let opacity_changed = previous.map(|p| p.opacity != spec.opacity).unwrap_or(true);
    let bounds_changed = previous.map(|p| p.fit_bounds != spec.fit_bounds).unwrap_or(true);
    let index_changed = previous.map(|p| p.index != spec.index).unwrap_or(true);

    if let Some(opacity) = spec.opacity {
        if opacity_changed {
            image.set_opacity(opacity);
        }
    }
    if let Some(rect) = spec.fit_bounds {
        if bounds_changed {
            image.fit_bounds(rect);
        }
    }
    if let Some(index) = spec.index {
        if index_changed && viewer.is_live() {
            viewer.engine().world().set_item_index(image, index);
        }
    }
}
