use clap::Parser;
use std::path::PathBuf;

/// Deep-zoom viewer bridge, driven against the simulated engine
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Viewer settings JSON (osdConfig, viewerConfig, layers, ...); built-in demo if omitted
    #[arg(value_name = "SETTINGS")]
    pub settings: Option<PathBuf>,

    /// Simulated user interactions (drag + settle) to run after the initial view
    #[arg(short = 'n', long = "frames", value_name = "N", default_value_t = 3)]
    pub frames: usize,

    /// Enable debug logging to file (default: seabridge.log)
    #[arg(short = 'l', long = "log", value_name = "LOG_FILE")]
    pub log_file: Option<Option<PathBuf>>,

    /// Increase logging verbosity (default: warn, -v: info, -vv: debug, -vvv+: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbosity: u8,
}
