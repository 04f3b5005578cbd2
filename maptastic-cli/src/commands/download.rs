//! `maptastic download`: fetch every tile of a region until it verifies.

use std::path::Path;
use std::process;

use clap::Args;
use maptastic::codec::{Quality, TileCodec};
use maptastic::config::ConfigFile;
use maptastic::coord::tile_count;
use maptastic::engine::{CancellationFlag, DownloadEngine, DownloadReport, RunOutcome};
use maptastic::fetcher::TileFetcher;
use maptastic::provider::{ReqwestClient, RetryingClient, TileEndpoint};
use maptastic::store::TileStore;
use tracing::info;

use super::common::{load_config, prepare_output, resolve_api_key, QualityLevel, TileSetArgs};
use super::progress::BatchProgressBar;
use crate::error::{CliError, EXIT_CANCELLED};

#[derive(Debug, Clone, Args)]
pub struct DownloadArgs {
    #[command(flatten)]
    pub tiles: TileSetArgs,

    /// Output quality; lower quality quantizes from a lower zoom
    #[arg(long, value_enum)]
    pub quality: Option<QualityLevel>,

    /// Tile service API key (overrides config.ini and MAPTASTIC_API_KEY)
    #[arg(long)]
    pub api_key: Option<String>,

    /// Concurrent downloads
    #[arg(long)]
    pub workers: Option<usize>,

    /// Full verify-and-retry cycles after the initial download
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Keep re-requesting tiles the server answered with 404
    #[arg(long)]
    pub retry_not_found: bool,

    /// Do not draw progress bars
    #[arg(long)]
    pub no_progress: bool,
}

impl DownloadArgs {
    fn apply(&self, config: &mut ConfigFile) {
        self.tiles.apply(config);
        if let Some(quality) = self.quality {
            config.download.quality = Quality::from(quality);
        }
        if let Some(workers) = self.workers {
            config.download.workers = workers;
        }
        if let Some(max_retries) = self.max_retries {
            config.download.max_retries = max_retries;
        }
    }
}

pub fn run(args: DownloadArgs, config_path: Option<&Path>) -> Result<(), CliError> {
    let mut config = load_config(config_path)?;
    args.apply(&mut config);

    let zooms = args.tiles.zoom_range()?;
    if config.download.workers == 0 {
        return Err(CliError::Config("--workers must be at least 1".to_string()));
    }

    // Validate everything before touching the network
    let api_key = resolve_api_key(args.api_key.as_deref(), &config)?;
    prepare_output(config.output_dir()?)?;
    let layout = config.layout()?;

    let cancel = CancellationFlag::new();
    let client = RetryingClient::new(
        ReqwestClient::new(&config.http_settings())?,
        config.request_retry_policy(),
    )
    .with_cancellation(cancel.clone());
    let endpoint = TileEndpoint::new(&config.provider.base_url, &config.provider.style, api_key);
    let codec = TileCodec::from_quality(config.download.quality);
    let fetcher = TileFetcher::new(client, endpoint, TileStore::new(layout), codec);

    let engine_config = config
        .engine_config()
        .with_skip_permanent_misses(!args.retry_not_found);

    let handler_flag = cancel.clone();
    ctrlc::set_handler(move || on_interrupt(&handler_flag))
        .map_err(|e| CliError::Config(format!("Failed to set signal handler: {}", e)))?;

    let engine = DownloadEngine::new(fetcher, engine_config)?.with_cancellation(cancel);

    println!("Maptastic {}", maptastic::VERSION);
    println!("  Region:  {}", args.tiles.region);
    println!("  Zoom:    {}", zooms);
    println!(
        "  Quality: {} (quantize from zoom {})",
        config.download.quality,
        config.download.quality.reduce_threshold()
    );
    println!("  Output:  {}", engine.store().layout().root().display());
    println!(
        "  Tiles:   {}",
        tile_count(&args.tiles.region, zooms)
    );
    println!();

    info!(
        workers = config.download.workers,
        max_retries = config.download.max_retries,
        style = %config.provider.style,
        "Download configured"
    );

    let observer = if args.no_progress {
        BatchProgressBar::hidden()
    } else {
        BatchProgressBar::new()
    };
    let report = engine.run(&args.tiles.region, zooms, &observer);

    print_summary(&report);
    outcome_to_result(&report)
}

/// First Ctrl-C stops the run gracefully; a second one exits immediately.
fn on_interrupt(flag: &CancellationFlag) {
    if flag.is_cancelled() {
        eprintln!();
        eprintln!("Interrupted again, exiting now");
        process::exit(EXIT_CANCELLED);
    }
    eprintln!();
    eprintln!("Received interrupt, finishing in-flight tiles (Ctrl-C again to force exit)...");
    flag.cancel();
}

fn print_summary(report: &DownloadReport) {
    println!();
    println!("Download {}:", report.outcome);
    println!("  Expected tiles:   {}", report.expected_tiles);
    println!("  Attempts:         {}", report.attempts);
    println!("  Fetched:          {}", report.stats.succeeded);
    println!("  Failed requests:  {}", report.stats.transient_failures);
    if !report.permanent_misses.is_empty() {
        println!("  Not on server:    {}", report.permanent_misses.len());
    }
    if !report.unresolved.is_empty() {
        println!("  Unresolved:       {}", report.unresolved.len());
    }
}

fn outcome_to_result(report: &DownloadReport) -> Result<(), CliError> {
    match report.outcome {
        RunOutcome::Done => Ok(()),
        RunOutcome::Exhausted => Err(CliError::DownloadFailed {
            unresolved: report.unresolved.len(),
        }),
        RunOutcome::Cancelled => Err(CliError::Cancelled),
    }
}
