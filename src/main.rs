//! apprelay - remote-build orchestration and device telemetry relay
//!
//! This is the binary entry point. All logic lives in the workspace crates.

use std::path::PathBuf;

use clap::Parser;

use apprelay_core::prelude::*;
use apprelay_server::Settings;

/// Remote-build orchestration and device telemetry relay for mobile app projects
#[derive(Parser, Debug)]
#[command(name = "apprelay")]
#[command(about = "Relay cloud builds and device telemetry for mobile app projects", long_about = None)]
struct Args {
    /// Path to config.toml (defaults to the platform config directory)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Listen address override, e.g. 127.0.0.1:5000
    #[arg(long, value_name = "ADDR")]
    listen: Option<String>,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    apprelay_core::logging::init()?;

    let mut settings = Settings::load(args.config.as_deref())?;
    if let Some(listen) = args.listen {
        settings.server.listen = listen;
    }

    info!("Configured listen address: {}", settings.server.listen);
    apprelay_server::serve(settings).await?;
    Ok(())
}
