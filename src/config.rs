//! Viewer settings files.
//!
//! A settings file is the JSON form of [`ViewerProps`] plus the layout of the
//! simulated engine the demo drives:
//!
//! ```json
//! {
//!   "osdConfig":    { "zoomPerDoubleClick": 2 },
//!   "viewerConfig": { "bounds": [2943, 1425, 1900, 1900] },
//!   "layers":       [ { "key": "page", "tileSource": ".../info.json", "fitBounds": [0, 0, 8272, 6128] } ],
//!   "home":         [0, 0, 8272, 6128],
//!   "container":    [800, 600]
//! }
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::bridge::ViewerProps;
use crate::entities::options::KEY_ZOOM_PER_DOUBLE_CLICK;
use crate::entities::{EngineOptions, KeyedLayer, LayerSpec, Rect, TileSource, ViewportIntent};

/// Environment override for the settings file path.
pub const SETTINGS_ENV: &str = "SEABRIDGE_SETTINGS";

/// Demo image plane (a scanned page, in pixels)
pub const DEMO_HOME: Rect = Rect::new(0.0, 0.0, 8272.0, 6128.0);
pub const DEMO_BOUNDS: Rect = Rect::new(2943.0, 1425.0, 1900.0, 1900.0);
pub const DEMO_TILE_SOURCE: &str = "https://stacks.example.org/image/iiif/page-1/info.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewerSettings {
    #[serde(flatten)]
    pub props: ViewerProps,
    /// Home region of the simulated engine
    pub home: Rect,
    /// Simulated container size in pixels
    pub container: [f64; 2],
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self { props: ViewerProps::default(), home: DEMO_HOME, container: [500.0, 500.0] }
    }
}

impl ViewerSettings {
    /// Built-in scenario: initial bounds plus one fitted page layer.
    pub fn demo() -> Self {
        let layer = LayerSpec::new(TileSource::Url(DEMO_TILE_SOURCE.to_string()))
            .with_fit_bounds(DEMO_HOME);
        Self {
            props: ViewerProps {
                osd_config: EngineOptions::new().with(KEY_ZOOM_PER_DOUBLE_CLICK, 2.0),
                viewer_config: ViewportIntent::default().with_bounds(DEMO_BOUNDS),
                layers: vec![KeyedLayer::new("page", layer)],
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Invalid viewer settings")
    }
}

/// Load settings from a JSON file.
pub fn load_settings(path: &Path) -> Result<ViewerSettings> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings file: {}", path.display()))?;
    let settings: ViewerSettings = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse settings file: {}", path.display()))?;
    debug!("Loaded {} layer(s) from {}", settings.props.layers.len(), path.display());
    Ok(settings)
}

/// Settings path from CLI, then [`SETTINGS_ENV`]; none means the built-in demo.
pub fn settings_path(cli: Option<&Path>) -> Option<PathBuf> {
    cli.map(Path::to_path_buf)
        .or_else(|| std::env::var(SETTINGS_ENV).ok().map(PathBuf::from))
}

pub fn resolve_settings(cli: Option<&Path>) -> Result<ViewerSettings> {
    match settings_path(cli) {
        Some(path) => {
            info!("Settings: {}", path.display());
            load_settings(&path)
        }
        None => {
            info!("No settings file, using built-in demo");
            Ok(ViewerSettings::demo())
        }
    }
}
