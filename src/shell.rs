//! Shared shell for the binary: logger setup and the scripted demo session.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use log::{debug, info};

use crate::bridge::{ContainerProps, DeepZoomViewer};
use crate::config::ViewerSettings;
use crate::core::debounced_relay::DEFAULT_RELAY_DELAY_MS;
use crate::entities::{Point, ViewportIntent, ViewportReport};
use crate::sim::{EngineCall, SimFactory};

/// Default log file for `--log` without a path
pub const DEFAULT_LOG_FILE: &str = "seabridge.log";

/// 0 (default) = warn, 1 (-v) = info, 2 (-vv) = debug, 3+ (-vvv) = trace
pub fn level_for(verbosity: u8) -> log::LevelFilter {
    match verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}

/// Initialize logging: to a file when `log_file` is set, else to stderr.
pub fn init_logger(verbosity: u8, log_file: Option<&Option<PathBuf>>) -> Result<()> {
    let level = level_for(verbosity);

    if let Some(path_opt) = log_file {
        let path = path_opt.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE));
        let file = std::fs::File::create(&path)
            .with_context(|| format!("Failed to create log file: {}", path.display()))?;

        env_logger::Builder::new()
            .filter_level(level)
            .format_timestamp_millis()
            .target(env_logger::Target::Pipe(Box::new(file)))
            .init();

        info!("Logging to file: {} (level: {:?})", path.display(), level);
    } else {
        // Respects RUST_LOG if set
        let default_level = match verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
            .format_timestamp_millis()
            .init();
    }
    Ok(())
}

/// What a demo session produced.
#[derive(Debug)]
pub struct DemoOutcome {
    pub reports: Vec<ViewportReport>,
    pub journal: Vec<EngineCall>,
    pub container: ContainerProps,
    pub images_loaded: usize,
}

/// Mount a viewer over the simulated engine and play a short session:
/// first frame, tile loads, `frames` user drags each echoed back as the new
/// declared viewport, then unmount.
pub fn run_demo(settings: &ViewerSettings, frames: usize) -> Result<DemoOutcome> {
    let factory = Arc::new(SimFactory::with_layout(settings.home, Point::from(settings.container)));
    let mut viewer = DeepZoomViewer::new(factory.clone());

    let reports = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&reports);
    viewer.on_update_viewport(move |report| {
        debug!("Report: {:?}", report);
        sink.lock().unwrap_or_else(|e| e.into_inner()).push(report);
    });

    let mut props = settings.props.clone();
    viewer.mount(&props);
    let engine = factory.last().context("Engine factory produced no engine")?;

    engine.open();
    let images_loaded = engine.resolve_loads();
    info!("Initial view applied, {} image(s) loaded", images_loaded);

    let center = Point::from(settings.container) * 0.5;
    for frame in 0..frames {
        engine.drag(center, Point::new(20.0, 10.0));
        engine.pointer_move(center);
        engine.finish_animation();
        viewer.tick_at(Instant::now() + Duration::from_millis(DEFAULT_RELAY_DELAY_MS));

        let last = reports.lock().unwrap_or_else(|e| e.into_inner()).last().copied();
        if let Some(report) = last {
            debug!("Frame {}: echoing ({}, {}) zoom {:.4}", frame, report.x, report.y, report.zoom);
            props.viewer_config = ViewportIntent::from(report);
            viewer.render(&props);
        }
    }

    let container = viewer.container_props();
    viewer.unmount();
    // Settle anything still in flight so teardown completes
    engine.resolve_loads();

    let reports = reports.lock().unwrap_or_else(|e| e.into_inner()).clone();
    Ok(DemoOutcome { reports, journal: engine.journal().calls(), container, images_loaded })
}
