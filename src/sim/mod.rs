//! Simulated engine - reference implementation of the engine boundary
//!
//! Used by the test suites and by the demo binary.

mod engine;
mod journal;
mod viewport;
mod world;

pub use engine::{DEFAULT_HOME, SimEngine, SimFactory};
pub use journal::{EngineCall, Journal};
pub use viewport::{DEFAULT_CONTAINER, SimViewport};
pub use world::{SimTiledImage, SimWorld};
