//! seabridge - keeps an imperative deep-zoom viewer engine in sync with
//! declared viewer state.
//!
//! Re-exports the bridge and its plumbing for use by the binary target.

// Engine-agnostic plumbing (handler bus, debounced relay, viewer registry)
pub mod core;

// Declared/reported data and the engine boundary traits
pub mod entities;

// Lifecycle, reconciler, layers, interaction, DeepZoomViewer
pub mod bridge;

// In-memory reference engine
pub mod sim;

// App modules
pub mod cli;
pub mod config;
pub mod shell;

pub use bridge::{ContainerProps, DeepZoomViewer, ViewerProps};
pub use core::{ViewerHandle, ViewerRegistry};
pub use entities::{
    Engine, EngineFactory, EngineOptions, KeyedLayer, LayerSpec, LoadError, Rect, TileSource,
    ViewportIntent, ViewportReport,
};
