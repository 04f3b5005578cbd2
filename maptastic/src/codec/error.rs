//! Error types for tile encoding operations.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Errors that can occur while persisting a tile.
#[derive(Debug)]
pub enum CodecError {
    /// The downloaded bytes are not a decodable image.
    DecodeFailed(String),
    /// Re-encoding the image failed.
    EncodingFailed(String),
    /// Writing the tile file failed.
    WriteFailed { path: PathBuf, source: io::Error },
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::DecodeFailed(msg) => write!(f, "Decoding failed: {}", msg),
            CodecError::EncodingFailed(msg) => write!(f, "Encoding failed: {}", msg),
            CodecError::WriteFailed { path, source } => {
                write!(f, "Failed to write {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for CodecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CodecError::WriteFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<image::ImageError> for CodecError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::Decoding(e) => CodecError::DecodeFailed(e.to_string()),
            image::ImageError::Unsupported(e) => CodecError::DecodeFailed(e.to_string()),
            other => CodecError::EncodingFailed(other.to_string()),
        }
    }
}

impl From<png::EncodingError> for CodecError {
    fn from(err: png::EncodingError) -> Self {
        CodecError::EncodingFailed(err.to_string())
    }
}
