//! Simulated image collection.
//!
//! `add_tiled_image` only queues the request; loads settle when the driver
//! calls `resolve_next()` / `resolve_loads()`, which is how tests put a
//! creation "in flight" across teardown.

use std::sync::{Arc, Mutex};

use crossbeam_channel::{Receiver, Sender, unbounded};
use indexmap::IndexMap;
use log::{debug, warn};

use crate::entities::{
    AddImageRequest, ImageHandle, ItemId, LoadError, Rect, TileSource, TiledImage, World,
};

use super::journal::{EngineCall, Journal};

/// Image object living in a [`SimWorld`].
#[derive(Debug)]
pub struct SimTiledImage {
    id: ItemId,
    source: TileSource,
    opacity: Mutex<f64>,
    bounds: Mutex<Option<Rect>>,
    journal: Journal,
}

impl SimTiledImage {
    pub fn source(&self) -> &TileSource {
        &self.source
    }

    pub fn opacity(&self) -> f64 {
        *self.opacity.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn bounds(&self) -> Option<Rect> {
        *self.bounds.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl TiledImage for SimTiledImage {
    fn id(&self) -> ItemId {
        self.id
    }

    fn set_opacity(&self, opacity: f64) {
        self.journal.record(EngineCall::SetOpacity { item: self.id, opacity });
        *self.opacity.lock().unwrap_or_else(|e| e.into_inner()) = opacity;
    }

    fn fit_bounds(&self, rect: Rect) {
        self.journal.record(EngineCall::ImageFitBounds { item: self.id, rect });
        *self.bounds.lock().unwrap_or_else(|e| e.into_inner()) = Some(rect);
    }
}

pub struct SimWorld {
    items: Mutex<IndexMap<ItemId, Arc<SimTiledImage>>>,
    pending_tx: Sender<AddImageRequest>,
    pending_rx: Receiver<AddImageRequest>,
    /// Source labels whose loads fail
    failing: Mutex<Vec<String>>,
    journal: Journal,
}

impl SimWorld {
    pub fn new(journal: Journal) -> Self {
        let (pending_tx, pending_rx) = unbounded();
        Self {
            items: Mutex::new(IndexMap::new()),
            pending_tx,
            pending_rx,
            failing: Mutex::new(Vec::new()),
            journal,
        }
    }

    /// Make future loads of `label` (see [`TileSource::describe`]) fail.
    pub fn fail_source(&self, label: impl Into<String>) {
        self.failing.lock().unwrap_or_else(|e| e.into_inner()).push(label.into());
    }

    pub fn pending_loads(&self) -> usize {
        self.pending_rx.len()
    }

    /// Settle the oldest queued load. Returns false if none was queued.
    pub fn resolve_next(&self) -> bool {
        let Ok(request) = self.pending_rx.try_recv() else {
            return false;
        };
        let label = request.tile_source.describe();
        let fails = self
            .failing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .any(|f| *f == label);

        if fails {
            debug!("SimWorld: load failed for {}", label);
            (request.error)(LoadError::Fetch(format!("{} unreachable", label)));
            return true;
        }

        let item = Arc::new(SimTiledImage {
            id: ItemId::new(),
            source: request.tile_source,
            opacity: Mutex::new(request.opacity.unwrap_or(1.0)),
            bounds: Mutex::new(request.fit_bounds),
            journal: self.journal.clone(),
        });
        {
            let mut items = self.items.lock().unwrap_or_else(|e| e.into_inner());
            match request.index {
                Some(i) if i < items.len() => {
                    items.shift_insert(i, item.id, Arc::clone(&item));
                }
                _ => {
                    items.insert(item.id, Arc::clone(&item));
                }
            }
        }
        debug!("SimWorld: loaded {} as {}", label, item.id);
        // Lock released before the callback re-enters the world
        (request.success)(item as ImageHandle);
        true
    }

    /// Settle every queued load, including ones queued by callbacks.
    pub fn resolve_loads(&self) -> usize {
        let mut n = 0;
        while self.resolve_next() {
            n += 1;
        }
        n
    }

    /// Item ids in stacking order (bottom first).
    pub fn item_ids(&self) -> Vec<ItemId> {
        self.items.lock().unwrap_or_else(|e| e.into_inner()).keys().copied().collect()
    }

    pub fn item(&self, id: ItemId) -> Option<Arc<SimTiledImage>> {
        self.items.lock().unwrap_or_else(|e| e.into_inner()).get(&id).cloned()
    }
}

impl World for SimWorld {
    fn add_tiled_image(&self, request: AddImageRequest) {
        self.journal.record(EngineCall::AddTiledImage {
            tile_source: request.tile_source.clone(),
            index: request.index,
            opacity: request.opacity,
            fit_bounds: request.fit_bounds,
        });
        if let Err(e) = self.pending_tx.send(request) {
            warn!("SimWorld: dropping load request: {}", e);
        }
    }

    fn remove_item(&self, item: &dyn TiledImage) {
        let id = item.id();
        self.journal.record(EngineCall::RemoveItem(id));
        if self.items.lock().unwrap_or_else(|e| e.into_inner()).shift_remove(&id).is_none() {
            warn!("SimWorld: remove of unknown item {}", id);
        }
    }

    fn set_item_index(&self, item: &dyn TiledImage, index: usize) {
        let id = item.id();
        self.journal.record(EngineCall::SetItemIndex { item: id, index });
        let mut items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(from) = items.get_index_of(&id) {
            let to = index.min(items.len() - 1);
            items.move_index(from, to);
        }
    }

    fn item_count(&self) -> usize {
        self.items.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    fn request(
        source: TileSource,
        index: Option<usize>,
        out: &Arc<StdMutex<Vec<Result<ItemId, LoadError>>>>,
    ) -> AddImageRequest {
        let ok = Arc::clone(out);
        let err = Arc::clone(out);
        AddImageRequest {
            tile_source: source,
            index,
            opacity: None,
            fit_bounds: None,
            success: Box::new(move |h: ImageHandle| ok.lock().unwrap().push(Ok(h.id()))),
            error: Box::new(move |e: LoadError| err.lock().unwrap().push(Err(e))),
        }
    }

    #[test]
    fn test_loads_settle_on_resolve() {
        let world = SimWorld::new(Journal::new());
        let out = Arc::new(StdMutex::new(Vec::new()));
        world.add_tiled_image(request(TileSource::Url("a".into()), None, &out));

        assert_eq!(world.pending_loads(), 1);
        assert_eq!(world.item_count(), 0);
        assert!(out.lock().unwrap().is_empty());

        assert_eq!(world.resolve_loads(), 1);
        assert_eq!(world.item_count(), 1);
        assert!(matches!(out.lock().unwrap()[0], Ok(_)));
    }

    #[test]
    fn test_failing_source() {
        let world = SimWorld::new(Journal::new());
        world.fail_source("bad");
        let out = Arc::new(StdMutex::new(Vec::new()));
        world.add_tiled_image(request(TileSource::Url("bad".into()), None, &out));
        world.resolve_loads();

        assert_eq!(world.item_count(), 0);
        assert!(matches!(out.lock().unwrap()[0], Err(LoadError::Fetch(_))));
    }

    #[test]
    fn test_index_insert_and_reorder() {
        let world = SimWorld::new(Journal::new());
        let out = Arc::new(StdMutex::new(Vec::new()));
        world.add_tiled_image(request(TileSource::Url("a".into()), None, &out));
        world.add_tiled_image(request(TileSource::Url("b".into()), None, &out));
        world.add_tiled_image(request(TileSource::Url("c".into()), Some(0), &out));
        world.resolve_loads();

        let ids = world.item_ids();
        let label = |id| world.item(id).unwrap().source().describe();
        assert_eq!(ids.iter().map(|id| label(*id)).collect::<Vec<_>>(), vec!["c", "a", "b"]);

        let c = world.item(ids[0]).unwrap();
        world.set_item_index(c.as_ref(), 5);
        assert_eq!(label(world.item_ids()[2]), "c");

        world.remove_item(c.as_ref());
        assert_eq!(world.item_count(), 2);
    }
}
