//! Declared image layers (tile sources).
//!
//! # Source identity
//!
//! A layer is recreated on the engine only when its *source identity*
//! changes, never when its contents change:
//! - `url` override set: identity is the URL string value.
//! - plain string source ([`TileSource::Url`]): identity is the string value,
//!   so props rebuilt on every render (or re-parsed from JSON) keep the image.
//! - structured descriptor: identity is the shared `Arc<TileSource>`
//!   allocation. An equal descriptor in a new `Arc` counts as a new source.
//!
//! # Engine copy
//!
//! The engine takes ownership of (and may mutate) the descriptor it is
//! given, so [`LayerSpec::engine_source`] always hands out a fresh copy.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::geometry::Rect;

/// Source descriptor forwarded to the engine untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TileSource {
    /// Descriptor location, e.g. an `info.json` / `.dzi` URL.
    Url(String),
    /// Structured descriptor object.
    Descriptor(Map<String, Value>),
}

impl Default for TileSource {
    fn default() -> Self {
        TileSource::Descriptor(Map::new())
    }
}

impl TileSource {
    /// Single flat image (no tiling) at `url`.
    pub fn image(url: &str) -> Self {
        let mut map = Map::new();
        map.insert("type".into(), json!("image"));
        map.insert("url".into(), json!(url));
        TileSource::Descriptor(map)
    }

    /// Short label for logs.
    pub fn describe(&self) -> String {
        match self {
            TileSource::Url(url) => url.clone(),
            TileSource::Descriptor(map) => map
                .get("url")
                .or_else(|| map.get("@id"))
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| "<descriptor>".to_string()),
        }
    }
}

/// Declared props for one image layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayerSpec {
    pub tile_source: Arc<TileSource>,
    /// Literal image URL; overrides `tile_source` when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Stacking position in the engine's world.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    /// 0.0..=1.0
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fit_bounds: Option<Rect>,
}

impl LayerSpec {
    pub fn new(tile_source: TileSource) -> Self {
        Self { tile_source: Arc::new(tile_source), ..Default::default() }
    }

    /// Layer sharing an existing descriptor allocation (same identity).
    pub fn shared(tile_source: Arc<TileSource>) -> Self {
        Self { tile_source, ..Default::default() }
    }

    pub fn from_url(url: impl Into<String>) -> Self {
        Self { url: Some(url.into()), ..Default::default() }
    }

    pub fn with_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = Some(opacity);
        self
    }

    pub fn with_fit_bounds(mut self, rect: Rect) -> Self {
        self.fit_bounds = Some(rect);
        self
    }

    /// True when both specs name the same source (see module docs).
    pub fn same_source(&self, other: &LayerSpec) -> bool {
        match (&self.url, &other.url) {
            (Some(a), Some(b)) => a == b,
            (None, None) => match (&*self.tile_source, &*other.tile_source) {
                (TileSource::Url(a), TileSource::Url(b)) => a == b,
                (TileSource::Descriptor(_), TileSource::Descriptor(_)) => {
                    Arc::ptr_eq(&self.tile_source, &other.tile_source)
                }
                _ => false,
            },
            _ => false,
        }
    }

    /// Fresh copy of the descriptor for the engine to own.
    pub fn engine_source(&self) -> TileSource {
        match &self.url {
            Some(url) => TileSource::image(url),
            None => (*self.tile_source).clone(),
        }
    }
}

/// Layer plus the stable key it is declared under.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyedLayer {
    pub key: String,
    #[serde(flatten)]
    pub spec: LayerSpec,
}

impl KeyedLayer {
    pub fn new(key: impl Into<String>, spec: LayerSpec) -> Self {
        Self { key: key.into(), spec }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_override_builds_image_descriptor() {
        let spec = LayerSpec::from_url("https://example.org/a.jpg");
        let src = spec.engine_source();
        let TileSource::Descriptor(map) = src else { panic!("expected descriptor") };
        assert_eq!(map.get("type"), Some(&json!("image")));
        assert_eq!(map.get("url"), Some(&json!("https://example.org/a.jpg")));
    }

    #[test]
    fn test_string_source_identity_is_value() {
        let a = LayerSpec::new(TileSource::Url("info.json".into()));
        let rebuilt = LayerSpec::new(TileSource::Url("info.json".into())).with_opacity(0.5);
        let other = LayerSpec::new(TileSource::Url("other.json".into()));

        assert!(a.same_source(&rebuilt));
        assert!(!a.same_source(&other));
    }

    #[test]
    fn test_descriptor_identity_is_allocation() {
        let a = LayerSpec::new(TileSource::image("p.png"));
        let same_alloc = LayerSpec::shared(Arc::clone(&a.tile_source)).with_opacity(0.5);
        let equal_contents = LayerSpec::new(TileSource::image("p.png"));

        assert!(a.same_source(&same_alloc));
        assert!(!a.same_source(&equal_contents));
        // String and descriptor forms never match
        assert!(!a.same_source(&LayerSpec::new(TileSource::Url("p.png".into()))));
    }

    #[test]
    fn test_url_identity_is_value() {
        let a = LayerSpec::from_url("x.png");
        let b = LayerSpec::from_url("x.png").with_index(2);
        let c = LayerSpec::from_url("y.png");
        assert!(a.same_source(&b));
        assert!(!a.same_source(&c));
        assert!(!a.same_source(&LayerSpec::default()));
    }

    #[test]
    fn test_engine_source_is_a_copy() {
        let spec = LayerSpec::new(TileSource::image("z.png"));
        let mut copy = spec.engine_source();
        if let TileSource::Descriptor(map) = &mut copy {
            map.insert("mutated".into(), json!(true));
        }
        assert_ne!(copy, *spec.tile_source);
    }

    #[test]
    fn test_keyed_layer_from_json() {
        let layer: KeyedLayer = serde_json::from_str(
            r#"{ "key": "a", "tileSource": "https://stacks.example/info.json", "fitBounds": [0, 0, 8272, 6128] }"#,
        )
        .unwrap();
        assert_eq!(layer.key, "a");
        assert_eq!(*layer.spec.tile_source, TileSource::Url("https://stacks.example/info.json".into()));
        assert_eq!(layer.spec.fit_bounds, Some(Rect::new(0.0, 0.0, 8272.0, 6128.0)));
    }
}
