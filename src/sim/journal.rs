//! Call journal - ordered record of every mutating call made on a sim engine.

use std::sync::{Arc, Mutex};

use log::trace;

use crate::entities::{EventKind, HandlerId, ItemId, Point, Rect, TileSource};

/// One recorded engine call.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    Create { id: Option<String> },
    SetCanvasAttribute { name: String, value: String },
    AddHandler(EventKind),
    AddOnceHandler(EventKind),
    RemoveHandler(HandlerId),
    RemoveAllHandlers,
    PanTo { center: Point, immediately: bool },
    ZoomTo { zoom: f64, ref_point: Option<Point>, immediately: bool },
    FitBounds { rect: Rect, immediately: bool },
    GoHome { immediately: bool },
    SetRotation(f64),
    SetFlip(bool),
    AddTiledImage {
        tile_source: TileSource,
        index: Option<usize>,
        opacity: Option<f64>,
        fit_bounds: Option<Rect>,
    },
    RemoveItem(ItemId),
    SetItemIndex { item: ItemId, index: usize },
    SetOpacity { item: ItemId, opacity: f64 },
    ImageFitBounds { item: ItemId, rect: Rect },
    Destroy,
}

impl EngineCall {
    /// Viewport camera mutation (pan/zoom/fit/home/rotation/flip).
    pub fn is_viewport_call(&self) -> bool {
        matches!(
            self,
            EngineCall::PanTo { .. }
                | EngineCall::ZoomTo { .. }
                | EngineCall::FitBounds { .. }
                | EngineCall::GoHome { .. }
                | EngineCall::SetRotation(_)
                | EngineCall::SetFlip(_)
        )
    }
}

/// Shared, append-only call log.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    calls: Arc<Mutex<Vec<EngineCall>>>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, call: EngineCall) {
        trace!("engine <- {:?}", call);
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).push(call);
    }

    /// Snapshot of all calls so far.
    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn filter(&self, pred: impl Fn(&EngineCall) -> bool) -> Vec<EngineCall> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|c| pred(c))
            .cloned()
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&EngineCall) -> bool) -> usize {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).iter().filter(|c| pred(c)).count()
    }

    pub fn len(&self) -> usize {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}
