//! Per-tile persistence: passthrough, re-encode or quantize.

use std::fs;
use std::path::{Path, PathBuf};

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::DynamicImage;
use tracing::trace;

use super::error::CodecError;
use super::quality::Quality;
use super::quantize::{median_cut, IndexedImage, MAX_PALETTE_SIZE};

const PNG_CONTENT_TYPE: &str = "image/png";

/// File extension of every tile [`TileCodec::persist`] writes.
pub const TILE_EXTENSION: &str = "png";

/// Which branch wrote a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistMode {
    /// Downloaded bytes written unchanged.
    Passthrough,
    /// Decoded and re-encoded as lossless PNG.
    Reencoded,
    /// Reduced to a palette of at most 256 colours.
    Quantized,
}

/// Writes downloaded tiles to disk, choosing a branch per tile.
///
/// Tiles at or above the reduce threshold are quantized; below it PNG
/// responses are stored as-is and anything else is re-encoded to PNG.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileCodec {
    reduce_threshold: u8,
}

impl TileCodec {
    pub fn new(reduce_threshold: u8) -> Self {
        Self { reduce_threshold }
    }

    pub fn from_quality(quality: Quality) -> Self {
        Self::new(quality.reduce_threshold())
    }

    pub fn reduce_threshold(&self) -> u8 {
        self.reduce_threshold
    }

    /// Branch that [`persist`](Self::persist) takes for a tile.
    pub fn mode_for(&self, content_type: Option<&str>, zoom: u8) -> PersistMode {
        if zoom >= self.reduce_threshold {
            PersistMode::Quantized
        } else if content_type.is_some_and(is_png) {
            PersistMode::Passthrough
        } else {
            PersistMode::Reencoded
        }
    }

    /// Write `bytes` to `dest`.
    ///
    /// The parent directory must exist. Output goes to a sibling temporary
    /// file first and is renamed into place.
    pub fn persist(
        &self,
        bytes: &[u8],
        dest: &Path,
        content_type: Option<&str>,
        zoom: u8,
    ) -> Result<PersistMode, CodecError> {
        let mode = self.mode_for(content_type, zoom);

        let encoded = match mode {
            PersistMode::Passthrough => None,
            PersistMode::Reencoded => Some(encode_rgb(&decode_opaque(bytes)?)?),
            PersistMode::Quantized => {
                let rgb = decode_opaque(bytes)?.to_rgb8();
                Some(encode_indexed(&median_cut(&rgb, MAX_PALETTE_SIZE))?)
            }
        };

        let data = encoded.as_deref().unwrap_or(bytes);
        write_atomic(dest, data)?;

        trace!(
            path = %dest.display(),
            zoom = zoom,
            mode = ?mode,
            bytes = data.len(),
            "Tile persisted"
        );
        Ok(mode)
    }
}

impl Default for TileCodec {
    fn default() -> Self {
        Self::from_quality(Quality::default())
    }
}

fn is_png(content_type: &str) -> bool {
    content_type
        .trim()
        .to_ascii_lowercase()
        .starts_with(PNG_CONTENT_TYPE)
}

/// Decode and drop any alpha channel.
fn decode_opaque(bytes: &[u8]) -> Result<DynamicImage, CodecError> {
    let img = image::load_from_memory(bytes)?;
    Ok(match img {
        DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => img,
        DynamicImage::ImageLumaA8(_) => DynamicImage::ImageLuma8(img.to_luma8()),
        other => DynamicImage::ImageRgb8(other.to_rgb8()),
    })
}

fn encode_rgb(img: &DynamicImage) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::new();
    let encoder =
        PngEncoder::new_with_quality(&mut out, CompressionType::Best, FilterType::Adaptive);
    img.write_with_encoder(encoder)?;
    Ok(out)
}

fn encode_indexed(indexed: &IndexedImage) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, indexed.width, indexed.height);
        encoder.set_color(png::ColorType::Indexed);
        encoder.set_depth(png::BitDepth::Eight);
        encoder.set_palette(indexed.palette_bytes());
        encoder.set_compression(png::Compression::Best);
        encoder.set_filter(png::FilterType::NoFilter);

        let mut writer = encoder.write_header()?;
        writer.write_image_data(&indexed.indices)?;
        writer.finish()?;
    }
    Ok(out)
}

fn write_atomic(dest: &Path, data: &[u8]) -> Result<(), CodecError> {
    let temp_path = temp_path_for(dest);

    fs::write(&temp_path, data).map_err(|source| CodecError::WriteFailed {
        path: temp_path.clone(),
        source,
    })?;

    fs::rename(&temp_path, dest).map_err(|source| {
        let _ = fs::remove_file(&temp_path);
        CodecError::WriteFailed {
            path: dest.to_path_buf(),
            source,
        }
    })
}

/// Sibling path a tile is staged at before the rename onto `dest`.
pub(crate) fn temp_path_for(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().map(|n| n.to_owned()).unwrap_or_default();
    name.push(".tmp");
    dest.with_file_name(name)
}
