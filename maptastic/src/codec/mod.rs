//! Tile persistence and image re-encoding.
//!
//! Each downloaded tile is written through [`TileCodec::persist`], which
//! picks one of three branches based on zoom and the declared content type:
//!
//! ```text
//!            zoom >= threshold?
//!            ┌──────┴──────┐
//!           yes            no
//!            │       content-type png?
//!            │        ┌─────┴─────┐
//!            ▼       yes          no
//!       Quantized     ▼           ▼
//!       (≤256 cols) Passthrough Reencoded
//! ```
//!
//! Quantization uses a median-cut palette and is written as an indexed PNG.

mod error;
mod persist;
mod quality;
mod quantize;

pub use error::CodecError;
pub(crate) use persist::temp_path_for;
pub use persist::{PersistMode, TileCodec, TILE_EXTENSION};
pub use quality::Quality;
pub use quantize::{median_cut, IndexedImage, MAX_PALETTE_SIZE};
