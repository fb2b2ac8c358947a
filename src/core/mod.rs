//! Core plumbing - handler bus, debounced relay, viewer registry
//!
//! These modules know nothing about viewports or layers.

pub mod debounced_relay;
pub mod event_bus;
pub mod registry;

// Re-exports for convenience
pub use debounced_relay::DebouncedRelay;
pub use event_bus::HandlerBus;
pub use registry::{CreationGuard, ViewerHandle, ViewerRegistry};
