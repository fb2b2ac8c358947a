//! Engine construction options.
//!
//! Options are an opaque key/value map forwarded to the engine factory.
//! The bridge fills in two defaults (`id`, `prefixUrl`) and reads one
//! extension key of its own (`zoomPerDoubleClick`).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Default location of the engine's navigation icons.
pub const DEFAULT_PREFIX_URL: &str = "https://openseadragon.github.io/openseadragon/images/";

pub const KEY_ID: &str = "id";
pub const KEY_PREFIX_URL: &str = "prefixUrl";
pub const KEY_ZOOM_PER_DOUBLE_CLICK: &str = "zoomPerDoubleClick";

/// Pass-through engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EngineOptions(Map<String, Value>);

impl EngineOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn id(&self) -> Option<&str> {
        self.0.get(KEY_ID).and_then(Value::as_str)
    }

    /// Double-click zoom multiplier. Zero or non-numeric means "not configured".
    pub fn zoom_per_double_click(&self) -> Option<f64> {
        self.0
            .get(KEY_ZOOM_PER_DOUBLE_CLICK)
            .and_then(Value::as_f64)
            .filter(|ratio| *ratio != 0.0 && ratio.is_finite())
    }

    /// Defaults (`id`, `prefixUrl`) overlaid with the caller's options.
    ///
    /// Caller keys win, including `id`.
    pub fn merged_over_defaults(&self, id: &str) -> EngineOptions {
        let mut merged = Map::new();
        merged.insert(KEY_ID.into(), Value::from(id));
        merged.insert(KEY_PREFIX_URL.into(), Value::from(DEFAULT_PREFIX_URL));
        for (key, value) in &self.0 {
            merged.insert(key.clone(), value.clone());
        }
        EngineOptions(merged)
    }
}
