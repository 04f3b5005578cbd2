//! Maptastic CLI - Command-line interface
//!
//! Downloads every map tile covering a region and zoom range into a local
//! directory tree, retrying until the tile set verifies complete.

mod commands;
mod error;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use maptastic::logging::{default_log_file, init_logging, LoggingGuard};

use commands::download::DownloadArgs;
use commands::verify::VerifyArgs;
use error::CliError;

#[derive(Parser)]
#[command(name = "maptastic")]
#[command(version, about = "Bulk map tile downloader", long_about = None)]
struct Cli {
    /// Config file (defaults to ~/.maptastic/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory for maptastic.log
    #[arg(long, global = true, default_value = maptastic::logging::default_log_dir())]
    log_dir: PathBuf,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download all tiles for a region, retrying until none are missing
    ///
    /// Tiles already on disk are skipped, so an interrupted or failed run
    /// can be resumed by repeating the same command.
    Download(DownloadArgs),

    /// Check that every tile for a region is present and non-empty
    Verify(VerifyArgs),
}

fn main() {
    let cli = Cli::parse();

    let guard = match start_logging(&cli.log_dir, cli.verbose) {
        Ok(guard) => guard,
        Err(e) => e.exit(),
    };

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Download(args) => commands::download::run(args, config),
        Commands::Verify(args) => commands::verify::run(args, config),
    };

    // Flush the log file before process::exit skips destructors
    drop(guard);

    if let Err(e) = result {
        e.exit();
    }
}

fn start_logging(log_dir: &Path, verbose: bool) -> Result<LoggingGuard, CliError> {
    let level = if verbose { "debug" } else { "info" };
    init_logging(log_dir, default_log_file(), level)
        .map_err(|e| CliError::LoggingInit(e.to_string()))
}
