//! `maptastic verify`: check an existing tile set without downloading.

use std::path::Path;

use clap::Args;
use maptastic::coord::{tiles_for_region, TileCoord};
use maptastic::store::{TileStore, VerifyReport};

use super::common::{load_config, TileSetArgs};
use crate::error::CliError;

/// Missing tiles listed individually before the output is truncated.
const LIST_LIMIT: usize = 20;

#[derive(Debug, Clone, Args)]
pub struct VerifyArgs {
    #[command(flatten)]
    pub tiles: TileSetArgs,

    /// List every missing or empty tile
    #[arg(long)]
    pub list: bool,
}

pub fn run(args: VerifyArgs, config_path: Option<&Path>) -> Result<(), CliError> {
    let mut config = load_config(config_path)?;
    args.tiles.apply(&mut config);

    let zooms = args.tiles.zoom_range()?;
    let store = TileStore::new(config.layout()?);

    let expected: Vec<TileCoord> = tiles_for_region(&args.tiles.region, zooms).collect();
    println!(
        "Verifying {} tiles in {}",
        expected.len(),
        store.layout().root().display()
    );

    let report = store.verify(&expected);
    print_report(&report, expected.len(), args.list);
    report_to_result(&report)
}

fn print_report(report: &VerifyReport, expected: usize, list_all: bool) {
    println!("  Present:   {}", expected - report.unresolved_count());
    println!("  Missing:   {}", report.missing_count());
    println!("  Zero-byte: {}", report.zero_count());

    let unresolved = report.unresolved();
    let shown = if list_all {
        unresolved.len()
    } else {
        unresolved.len().min(LIST_LIMIT)
    };
    for coord in &unresolved[..shown] {
        println!("    {}", coord);
    }
    if shown < unresolved.len() {
        println!("    ... and {} more (use --list)", unresolved.len() - shown);
    }
}

fn report_to_result(report: &VerifyReport) -> Result<(), CliError> {
    if report.is_clean() {
        println!("All tiles present.");
        Ok(())
    } else {
        Err(CliError::VerifyFailed {
            missing: report.missing_count(),
            zero: report.zero_count(),
        })
    }
}
