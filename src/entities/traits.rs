//! Engine boundary.
//!
//! The bridge drives any deep-zoom engine that implements these traits.
//! They mirror the capability surface the bridge actually uses:
//! construction from options, destroy, named event handlers, a viewport
//! with current/target camera values, and a world of tiled images.
//!
//! Implementations must not hold internal locks while invoking handlers or
//! load callbacks: handlers call straight back into the engine.
//!
//! Reference implementation: [`crate::sim::SimEngine`].

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::LoadError;
use super::events::{EventKind, ViewerEvent};
use super::geometry::{Point, Rect};
use super::layer::TileSource;
use super::options::EngineOptions;

/// Event handler callback.
pub type Handler = Arc<dyn Fn(&ViewerEvent) + Send + Sync>;

/// Subscription token returned by [`Engine::add_handler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(pub u64);

/// Identity of an image object inside the engine's world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemId(pub Uuid);

impl ItemId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Imperative viewer instance.
pub trait Engine: Send + Sync {
    fn add_handler(&self, kind: EventKind, handler: Handler) -> HandlerId;

    /// Handler removed right before its first invocation.
    fn add_once_handler(&self, kind: EventKind, handler: Handler) -> HandlerId;

    /// Returns false if the id was not (or no longer) registered.
    fn remove_handler(&self, id: HandlerId) -> bool;

    fn remove_all_handlers(&self);

    /// Dispatch `event` to the handlers registered for its kind.
    fn raise_event(&self, event: ViewerEvent);

    fn viewport(&self) -> &dyn Viewport;

    fn world(&self) -> &dyn World;

    /// Set an attribute on the engine's drawing canvas element.
    fn set_canvas_attribute(&self, name: &str, value: &str);

    fn destroy(&self);
}

/// Camera over the logical image plane.
///
/// Pan and zoom have two values: the current (animated) one and the
/// animation target. The bridge compares against and reports targets.
pub trait Viewport: Send + Sync {
    fn bounds(&self) -> Rect;
    fn fit_bounds(&self, rect: Rect, immediately: bool);

    /// Degrees.
    fn rotation(&self) -> f64;
    fn set_rotation(&self, degrees: f64);

    fn flip(&self) -> bool;
    fn set_flip(&self, flip: bool);

    fn center(&self) -> Point;
    fn center_target(&self) -> Point;
    fn pan_to(&self, center: Point, immediately: bool);

    fn zoom(&self) -> f64;
    fn zoom_target(&self) -> f64;
    /// Zoom keeping `ref_point` fixed on screen (viewport center when `None`).
    fn zoom_to(&self, zoom: f64, ref_point: Option<Point>, immediately: bool);

    fn go_home(&self, immediately: bool);

    /// Container pixel -> viewport coordinates.
    fn point_from_pixel(&self, pixel: Point) -> Point;
}

/// Collection of image objects rendered by the engine.
pub trait World: Send + Sync {
    /// Start asynchronous creation; exactly one of the request callbacks fires later.
    fn add_tiled_image(&self, request: AddImageRequest);
    fn remove_item(&self, item: &dyn TiledImage);
    fn set_item_index(&self, item: &dyn TiledImage, index: usize);
    fn item_count(&self) -> usize;
}

/// One engine-managed image layer.
pub trait TiledImage: Send + Sync + fmt::Debug {
    fn id(&self) -> ItemId;
    fn set_opacity(&self, opacity: f64);
    /// Place the image so it covers exactly `rect`.
    fn fit_bounds(&self, rect: Rect);
}

pub type ImageHandle = Arc<dyn TiledImage>;
pub type SuccessCallback = Box<dyn FnOnce(ImageHandle) + Send>;
pub type ErrorCallback = Box<dyn FnOnce(LoadError) + Send>;

/// Arguments of [`World::add_tiled_image`].
pub struct AddImageRequest {
    /// Engine-owned copy; the engine may mutate it.
    pub tile_source: TileSource,
    pub index: Option<usize>,
    pub opacity: Option<f64>,
    pub fit_bounds: Option<Rect>,
    pub success: SuccessCallback,
    pub error: ErrorCallback,
}

impl fmt::Debug for AddImageRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddImageRequest")
            .field("tile_source", &self.tile_source)
            .field("index", &self.index)
            .field("opacity", &self.opacity)
            .field("fit_bounds", &self.fit_bounds)
            .finish_non_exhaustive()
    }
}

/// Constructs engine instances from merged options.
pub trait EngineFactory: Send + Sync {
    fn create(&self, options: &EngineOptions) -> Arc<dyn Engine>;
}

/// Blanket impl: Arc<T> is a factory if T is
impl<T: EngineFactory + ?Sized> EngineFactory for Arc<T> {
    fn create(&self, options: &EngineOptions) -> Arc<dyn Engine> {
        (**self).create(options)
    }
}
