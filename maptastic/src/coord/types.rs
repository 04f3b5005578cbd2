//! Coordinate type definitions

use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

/// Web Mercator valid latitude range
pub const MIN_LAT: f64 = -85.05112878;
pub const MAX_LAT: f64 = 85.05112878;

/// Valid longitude range
pub const MIN_LON: f64 = -180.0;
pub const MAX_LON: f64 = 180.0;

/// Zoom levels accepted by raster tile services
pub const MIN_ZOOM: u8 = 0;
pub const MAX_ZOOM: u8 = 22;

/// Tile coordinates in the Web Mercator / Slippy Map system.
///
/// `x` grows eastward from the antimeridian, `y` grows southward from the
/// northern Mercator limit. Both lie in `0..2^zoom`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord {
    /// Zoom level (0-22)
    pub zoom: u8,
    /// Column (east-west), 0 at west
    pub x: u32,
    /// Row (north-south), 0 at north
    pub y: u32,
}

impl TileCoord {
    /// Creates a tile coordinate without validation.
    #[inline]
    pub const fn new(zoom: u8, x: u32, y: u32) -> Self {
        Self { zoom, x, y }
    }

    /// Number of tiles along one axis at this tile's zoom level.
    #[inline]
    pub fn axis_len(&self) -> u64 {
        1u64 << self.zoom
    }

    /// Returns true when both indices fall inside the quadtree at this zoom.
    pub fn is_valid(&self) -> bool {
        self.zoom <= MAX_ZOOM
            && u64::from(self.x) < self.axis_len()
            && u64::from(self.y) < self.axis_len()
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}

/// A latitude/longitude rectangle whose covering tiles are downloaded.
///
/// The longitude pair is treated as a flat rectangle; a box crossing the
/// antimeridian is not split.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub max_lat: f64,
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
}

impl Region {
    /// Creates a region, rejecting non-finite values and an inverted
    /// latitude pair.
    pub fn new(max_lat: f64, min_lon: f64, min_lat: f64, max_lon: f64) -> Result<Self, CoordError> {
        for lat in [max_lat, min_lat] {
            if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
                return Err(CoordError::InvalidLatitude(lat));
            }
        }
        for lon in [min_lon, max_lon] {
            if !lon.is_finite() || !(-360.0..=360.0).contains(&lon) {
                return Err(CoordError::InvalidLongitude(lon));
            }
        }
        if max_lat < min_lat {
            return Err(CoordError::InvertedLatitudes { max_lat, min_lat });
        }

        Ok(Self {
            max_lat,
            min_lon,
            min_lat,
            max_lon,
        })
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            self.max_lat, self.min_lon, self.min_lat, self.max_lon
        )
    }
}

impl FromStr for Region {
    type Err = CoordError;

    /// Parses `maxLat,minLon,minLat,maxLon`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(CoordError::InvalidRegion(format!(
                "expected 4 comma-separated values (maxLat,minLon,minLat,maxLon), got {}",
                parts.len()
            )));
        }

        let mut values = [0.0_f64; 4];
        for (slot, part) in values.iter_mut().zip(&parts) {
            *slot = part
                .parse()
                .map_err(|_| CoordError::InvalidRegion(format!("'{}' is not a number", part)))?;
        }

        Region::new(values[0], values[1], values[2], values[3])
    }
}

/// Inclusive range of zoom levels to download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoomRange {
    start: u8,
    end: u8,
}

impl ZoomRange {
    /// Creates a zoom range; both ends must be within `[MIN_ZOOM, MAX_ZOOM]`
    /// and `start <= end`.
    pub fn new(start: u8, end: u8) -> Result<Self, CoordError> {
        if start > MAX_ZOOM {
            return Err(CoordError::InvalidZoom(start));
        }
        if end > MAX_ZOOM {
            return Err(CoordError::InvalidZoom(end));
        }
        if start > end {
            return Err(CoordError::InvalidZoomRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// A range covering a single zoom level.
    pub fn single(zoom: u8) -> Result<Self, CoordError> {
        Self::new(zoom, zoom)
    }

    pub fn start(&self) -> u8 {
        self.start
    }

    pub fn end(&self) -> u8 {
        self.end
    }

    pub fn iter(&self) -> RangeInclusive<u8> {
        self.start..=self.end
    }
}

impl IntoIterator for ZoomRange {
    type Item = u8;
    type IntoIter = RangeInclusive<u8>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for ZoomRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

/// Lazy, restartable enumeration of every tile inside a column/row rectangle
/// at one zoom level.
///
/// Yields column-major: all rows of the first column, then the next column.
/// A clone taken before iteration starts yields the full sequence again;
/// a clone taken partway through continues from the same position.
#[derive(Debug, Clone)]
pub struct TileRange {
    zoom: u8,
    x_start: u32,
    x_end: u32,
    y_start: u32,
    y_end: u32,
    next_x: u32,
    next_y: u32,
    remaining: u64,
}

impl TileRange {
    /// Creates a range over the closed intervals `[x0, x1]` × `[y0, y1]`.
    ///
    /// The bounds are sorted, so callers may pass them in either order.
    pub fn new(zoom: u8, x0: u32, x1: u32, y0: u32, y1: u32) -> Self {
        let (x_start, x_end) = if x0 <= x1 { (x0, x1) } else { (x1, x0) };
        let (y_start, y_end) = if y0 <= y1 { (y0, y1) } else { (y1, y0) };
        let remaining =
            (u64::from(x_end - x_start) + 1) * (u64::from(y_end - y_start) + 1);

        Self {
            zoom,
            x_start,
            x_end,
            y_start,
            y_end,
            next_x: x_start,
            next_y: y_start,
            remaining,
        }
    }

    /// Column bounds `(first, last)`, inclusive.
    pub fn columns(&self) -> (u32, u32) {
        (self.x_start, self.x_end)
    }

    /// Row bounds `(first, last)`, inclusive.
    pub fn rows(&self) -> (u32, u32) {
        (self.y_start, self.y_end)
    }
}

impl Iterator for TileRange {
    type Item = TileCoord;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let tile = TileCoord::new(self.zoom, self.next_x, self.next_y);
        self.remaining -= 1;

        if self.next_y == self.y_end {
            self.next_y = self.y_start;
            self.next_x = self.next_x.saturating_add(1);
        } else {
            self.next_y += 1;
        }

        Some(tile)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.remaining).unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for TileRange {}

/// Errors that can occur during coordinate handling.
#[derive(Debug, Clone, PartialEq)]
pub enum CoordError {
    /// Latitude is not a finite value within ±90°
    InvalidLatitude(f64),
    /// Longitude is not a finite value
    InvalidLongitude(f64),
    /// Zoom level is outside valid range (0 to 22)
    InvalidZoom(u8),
    /// Zoom range start exceeds its end
    InvalidZoomRange { start: u8, end: u8 },
    /// Northern latitude is south of the southern latitude
    InvertedLatitudes { max_lat: f64, min_lat: f64 },
    /// Region string could not be parsed
    InvalidRegion(String),
}

impl fmt::Display for CoordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordError::InvalidLatitude(lat) => {
                write!(f, "Invalid latitude: {} (must be between -90 and 90)", lat)
            }
            CoordError::InvalidLongitude(lon) => {
                write!(f, "Invalid longitude: {}", lon)
            }
            CoordError::InvalidZoom(zoom) => {
                write!(
                    f,
                    "Invalid zoom level: {} (must be between {} and {})",
                    zoom, MIN_ZOOM, MAX_ZOOM
                )
            }
            CoordError::InvalidZoomRange { start, end } => {
                write!(
                    f,
                    "Invalid zoom range: start {} is greater than end {}",
                    start, end
                )
            }
            CoordError::InvertedLatitudes { max_lat, min_lat } => {
                write!(
                    f,
                    "Invalid region: max latitude {} is south of min latitude {}",
                    max_lat, min_lat
                )
            }
            CoordError::InvalidRegion(msg) => write!(f, "Invalid region: {}", msg),
        }
    }
}

impl std::error::Error for CoordError {}
