//! Coordinate conversion module
//!
//! Maps geographic coordinates (latitude/longitude) onto the Web Mercator
//! tile grid used by slippy-map tile services, and enumerates the tiles
//! covering a bounding box.
//!
//! # Polar and antimeridian behaviour
//!
//! The Mercator row formula diverges at ±90°. Latitudes are clamped to
//! ±[`MAX_LAT`] before projection, and longitudes to ±180°, so every
//! computed index lands in `[0, 2^zoom - 1]`. A region crossing the
//! antimeridian is not split: its columns are the sorted interval between
//! the two longitude columns.

mod types;

pub use types::{
    CoordError, Region, TileCoord, TileRange, ZoomRange, MAX_LAT, MAX_LON, MAX_ZOOM, MIN_LAT,
    MIN_LON, MIN_ZOOM,
};

use std::f64::consts::PI;

#[inline]
fn axis_tiles(zoom: u8) -> f64 {
    2.0_f64.powi(zoom as i32)
}

#[inline]
fn clamp_index(value: f64, zoom: u8) -> u32 {
    let max_index = (1u64 << zoom) - 1;
    let floored = value.floor().max(0.0) as u64;
    floored.min(max_index) as u32
}

#[inline]
fn check_zoom(zoom: u8) -> Result<(), CoordError> {
    if zoom > MAX_ZOOM {
        return Err(CoordError::InvalidZoom(zoom));
    }
    Ok(())
}

// Callers guarantee zoom <= MAX_ZOOM.
#[inline]
fn column_index(lon: f64, zoom: u8) -> u32 {
    let lon = lon.clamp(MIN_LON, MAX_LON);
    clamp_index((lon + 180.0) / 360.0 * axis_tiles(zoom), zoom)
}

#[inline]
fn row_index(lat: f64, zoom: u8) -> u32 {
    let lat_rad = lat.clamp(MIN_LAT, MAX_LAT).to_radians();
    clamp_index(
        (1.0 - lat_rad.tan().asinh() / PI) / 2.0 * axis_tiles(zoom),
        zoom,
    )
}

fn bounding_box(region: &Region, zoom: u8) -> TileRange {
    TileRange::new(
        zoom,
        column_index(region.min_lon, zoom),
        column_index(region.max_lon, zoom),
        row_index(region.max_lat, zoom),
        row_index(region.min_lat, zoom),
    )
}

/// Returns the tile column containing `lon` at `zoom`.
///
/// `x = floor(((lon + 180) / 360) * 2^zoom)`, with `lon = 180` folded into
/// the last column. Zoom levels above [`MAX_ZOOM`] are rejected.
pub fn tile_column(lon: f64, zoom: u8) -> Result<u32, CoordError> {
    check_zoom(zoom)?;
    Ok(column_index(lon, zoom))
}

/// Returns the tile row containing `lat` at `zoom`.
///
/// `y = floor(((1 - ln(tan φ + sec φ) / π) / 2) * 2^zoom)`, computed through
/// the equivalent `asinh(tan φ)`. Rows increase southward.
pub fn tile_row(lat: f64, zoom: u8) -> Result<u32, CoordError> {
    check_zoom(zoom)?;
    Ok(row_index(lat, zoom))
}

/// Converts a geographic point to the tile containing it.
pub fn to_tile_coords(lat: f64, lon: f64, zoom: u8) -> Result<TileCoord, CoordError> {
    if !lat.is_finite() {
        return Err(CoordError::InvalidLatitude(lat));
    }
    if !lon.is_finite() {
        return Err(CoordError::InvalidLongitude(lon));
    }
    check_zoom(zoom)?;

    Ok(TileCoord::new(zoom, column_index(lon, zoom), row_index(lat, zoom)))
}

/// Returns every tile covering `region` at `zoom`.
///
/// Columns span the sorted interval between the columns of `min_lon` and
/// `max_lon`; rows span the sorted interval between the rows of `max_lat`
/// (north, smaller row) and `min_lat`.
pub fn tiles_for_bounding_box(region: &Region, zoom: u8) -> Result<TileRange, CoordError> {
    check_zoom(zoom)?;
    Ok(bounding_box(region, zoom))
}

/// Returns every tile covering `region` across all zoom levels in `zooms`,
/// lowest zoom first.
pub fn tiles_for_region(
    region: &Region,
    zooms: ZoomRange,
) -> impl Iterator<Item = TileCoord> + Clone {
    let region = *region;
    zooms
        .into_iter()
        .flat_map(move |zoom| bounding_box(&region, zoom))
}

/// Counts the tiles [`tiles_for_region`] would yield without enumerating them.
pub fn tile_count(region: &Region, zooms: ZoomRange) -> u64 {
    zooms
        .into_iter()
        .map(|zoom| bounding_box(region, zoom).len() as u64)
        .sum()
}
