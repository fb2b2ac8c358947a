//! Entities module - plain data crossing the bridge, plus the engine boundary
//!
//! - Declared state: `ViewportIntent`, `LayerSpec`, `EngineOptions`
//! - Reported state: `ViewportReport`
//! - Engine boundary traits: `Engine`, `Viewport`, `World`, `TiledImage`

pub mod error;
pub mod events;
pub mod geometry;
pub mod layer;
pub mod options;
pub mod traits;
pub mod viewport;

pub use error::LoadError;
pub use events::{EventKind, PointerEvent, ViewerEvent};
pub use geometry::{Point, Rect, round_half_up};
pub use layer::{KeyedLayer, LayerSpec, TileSource};
pub use options::EngineOptions;
pub use traits::{
    AddImageRequest, Engine, EngineFactory, Handler, HandlerId, ImageHandle, ItemId, TiledImage,
    Viewport, World,
};
pub use viewport::{ViewportIntent, ViewportReport};
