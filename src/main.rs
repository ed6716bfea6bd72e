//! Clipsmith highlight clipper
//!
//! Finds high-energy moments in long-form video and exports them as short
//! clips, optionally reframed to portrait with stacked overlay video and
//! burned-in karaoke subtitles.
//!
//! # Usage
//!
//! ```bash
//! clipsmith suggest --input stream.mp4
//! clipsmith export --input stream.mp4 --start 01:30 --end 01:50 --subtitles
//! clipsmith run --input stream.mp4 --output-dir clips --portrait
//! ```

use anyhow::Result;
use clap::Parser;
use tracing::info;

use clipsmith::cli::{commands, Cli, Commands};
use clipsmith::config::Config;

/// Main entry point for the Clipsmith CLI
#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    info!("Starting Clipsmith");

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Suggest(args) => {
            info!("Executing suggest command");
            commands::suggest(args, &config).await?;
        }
        Commands::Export(args) => {
            info!("Executing export command");
            commands::export(args, &config).await?;
        }
        Commands::Run(args) => {
            info!("Executing run command");
            commands::run(args, &config).await?;
        }
    }

    info!("Clipsmith completed successfully");
    Ok(())
}
