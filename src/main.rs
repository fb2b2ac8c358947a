use anyhow::Result;
use clap::Parser;
use log::{debug, info};

use seabridge::cli::Args;
use seabridge::{config, shell};

fn main() -> Result<()> {
    let args = Args::parse();
    shell::init_logger(args.verbosity, args.log_file.as_ref())?;

    info!("seabridge demo starting...");
    debug!("Command-line args: {:?}", args);

    let settings = config::resolve_settings(args.settings.as_deref())?;
    let outcome = shell::run_demo(&settings, args.frames)?;

    println!("Container: {}", serde_json::to_string(&outcome.container)?);
    println!("Images loaded: {}", outcome.images_loaded);
    println!("\nViewport reports ({}):", outcome.reports.len());
    for report in &outcome.reports {
        println!("  {}", serde_json::to_string(report)?);
    }
    println!("\nEngine calls ({}):", outcome.journal.len());
    for (i, call) in outcome.journal.iter().enumerate() {
        println!("  {:3}  {:?}", i, call);
    }
    Ok(())
}
