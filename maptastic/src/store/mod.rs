//! On-disk tile storage.
//!
//! Tiles live at `<root>/<provider>/<style>/<zoom>/<x>/<y>.<ext>`. There is no
//! index file: a tile is present when a non-empty file exists at its path.
//! Status is always derived from the filesystem, never cached. Checking a
//! tile also removes any `<y>.<ext>.tmp` left behind by an interrupted write.
//!
//! # Example
//!
//! ```ignore
//! use maptastic::store::{TileLayout, TileStore};
//!
//! let store = TileStore::new(TileLayout::new("/srv/maps", "thunderforest", "atlas"));
//! let report = store.verify(&expected);
//! println!("{} missing, {} zero-byte", report.missing_count(), report.zero_count());
//! ```

mod layout;

pub use layout::TileLayout;

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::codec::temp_path_for;
use crate::coord::TileCoord;

/// Derived on-disk state of one tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileStatus {
    /// File exists and is non-empty.
    Ok,
    /// No file at the tile path.
    Missing,
    /// File exists but is empty or its metadata is unreadable.
    Zero,
}

impl fmt::Display for TileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TileStatus::Ok => write!(f, "ok"),
            TileStatus::Missing => write!(f, "missing"),
            TileStatus::Zero => write!(f, "zero"),
        }
    }
}

/// Errors from tile storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to create a tile directory.
    #[error("failed to create directory {}: {source}", .path.display())]
    CreateDir { path: PathBuf, source: io::Error },
}

/// Result of one verification pass over an expected tile set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyReport {
    /// Tiles with no file on disk.
    pub missing: Vec<TileCoord>,
    /// Tiles whose file was empty or unreadable (and has been removed).
    pub zero: Vec<TileCoord>,
}

impl VerifyReport {
    pub fn missing_count(&self) -> usize {
        self.missing.len()
    }

    pub fn zero_count(&self) -> usize {
        self.zero.len()
    }

    /// Total tiles needing a download.
    pub fn unresolved_count(&self) -> usize {
        self.missing.len() + self.zero.len()
    }

    /// True when every expected tile is present and non-empty.
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.zero.is_empty()
    }

    /// All tiles needing a download, missing first.
    pub fn unresolved(&self) -> Vec<TileCoord> {
        self.missing.iter().chain(&self.zero).copied().collect()
    }
}

/// Filesystem-backed tile store.
#[derive(Debug, Clone)]
pub struct TileStore {
    layout: TileLayout,
}

impl TileStore {
    pub fn new(layout: TileLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &TileLayout {
        &self.layout
    }

    /// Deterministic file path for a tile.
    pub fn path_for(&self, coord: &TileCoord) -> PathBuf {
        self.layout.tile_path(coord)
    }

    /// Creates the tile's parent directories and returns the tile path.
    ///
    /// Safe to call concurrently: an already existing directory is not an
    /// error.
    pub fn ensure_parent(&self, coord: &TileCoord) -> Result<PathBuf, StoreError> {
        let dir = self.layout.tile_dir(coord);
        fs::create_dir_all(&dir).map_err(|source| StoreError::CreateDir {
            path: dir.clone(),
            source,
        })?;
        Ok(self.layout.tile_path(coord))
    }

    /// Checks a tile on disk.
    ///
    /// A zero-byte or unreadable file is deleted so the next dispatch
    /// downloads it afresh. A failed deletion is logged and the tile is still
    /// reported as [`TileStatus::Zero`].
    pub fn status_of(&self, coord: &TileCoord) -> TileStatus {
        let path = self.path_for(coord);
        remove_stale_temp(coord, &path);
        let status = classify(&path);

        if status == TileStatus::Zero {
            match fs::remove_file(&path) {
                Ok(()) => warn!(
                    tile = %coord,
                    "Zero-byte or unreadable tile removed before re-download"
                ),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => error!(
                    tile = %coord,
                    path = %path.display(),
                    error = %e,
                    "Failed to remove corrupt tile"
                ),
            }
        }

        status
    }

    /// Verifies every tile in `coords`, returning those not [`TileStatus::Ok`].
    ///
    /// Input order is preserved within each partition.
    pub fn verify(&self, coords: &[TileCoord]) -> VerifyReport {
        let statuses: Vec<TileStatus> = coords.par_iter().map(|c| self.status_of(c)).collect();

        let mut report = VerifyReport::default();
        for (coord, status) in coords.iter().zip(statuses) {
            match status {
                TileStatus::Ok => {}
                TileStatus::Missing => report.missing.push(*coord),
                TileStatus::Zero => report.zero.push(*coord),
            }
        }

        if report.is_clean() {
            info!(
                tiles = coords.len(),
                "Integrity check: all expected tiles are present and non-empty"
            );
        } else {
            warn!(
                missing = report.missing_count(),
                zero = report.zero_count(),
                "Integrity check: tiles missing or zero bytes"
            );
        }

        report
    }
}

fn remove_stale_temp(coord: &TileCoord, path: &Path) {
    let temp = temp_path_for(path);
    match fs::remove_file(&temp) {
        Ok(()) => debug!(tile = %coord, "Removed leftover temp file"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(
            path = %temp.display(),
            error = %e,
            "Failed to remove leftover temp file"
        ),
    }
}

fn classify(path: &Path) -> TileStatus {
    match fs::metadata(path) {
        Ok(meta) if meta.is_file() && meta.len() > 0 => TileStatus::Ok,
        Ok(_) => TileStatus::Zero,
        Err(e) if e.kind() == io::ErrorKind::NotFound => TileStatus::Missing,
        Err(_) => TileStatus::Zero,
    }
}
