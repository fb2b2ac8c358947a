//! Bridge - keeps an imperative engine in sync with declared viewer state
//!
//! Components (leaf to root):
//! - `layer`: one controller per declared image layer
//! - `reconciler`: declared viewport intent -> engine calls, settled camera -> reports
//! - `interaction`: cursor state, double-click zoom, debounced pointer relay
//! - `lifecycle`: engine creation/teardown, handler bindings
//! - `viewer`: [`DeepZoomViewer`], composing all of the above
//!
//! Declared state flows in through `render()`; engine state flows out through
//! the viewport report callback. The [`crate::core::ViewerRegistry`] is the
//! rendezvous point between the two.

pub mod interaction;
pub mod layer;
pub mod lifecycle;
pub mod reconciler;
pub mod viewer;

pub use interaction::Interaction;
pub use layer::LayerController;
pub use lifecycle::{HandlerBindings, Lifecycle};
pub use reconciler::{Reconciler, ReportFn, apply_initial, read_report, reconcile};
pub use viewer::{ContainerProps, DeepZoomViewer, ViewerProps};
