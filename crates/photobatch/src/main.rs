//! Photobatch CLI - resize, re-encode and date-rename whole photo folders.
//!
//! Every supported image under a folder is fitted into a bounding box,
//! re-encoded as JPEG and written as `{folder}_{YYYYMMDD}_{NNN}.jpg`.
//!
//! # Usage
//!
//! ```bash
//! # Process a folder with the configured defaults (800x600, quality 70)
//! photobatch run ./Trip
//!
//! # Custom size and quality, metadata stripped, JSON report
//! photobatch run ./Trip --width 1920 --height 1080 -q 85 --strip-metadata --report report.json
//!
//! # View configuration
//! photobatch config show
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// Photobatch - batch resize, re-encode and rename photo folders.
#[derive(Parser, Debug)]
#[command(name = "photobatch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Resize, re-encode and rename every image in a folder
    Run(cli::run::RunArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so config warnings go through eprintln.
    // `run` reloads the config and treats an invalid file as fatal.
    let config = match photobatch_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Check your config file with `photobatch config path`."
            );
            photobatch_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Photobatch v{}", photobatch_core::VERSION);

    match cli.command {
        Commands::Run(args) => cli::run::execute(args).await,
        Commands::Config(args) => cli::config::execute(args).await,
    }
}
