//! Directory layout for persisted tiles.

use std::path::{Path, PathBuf};

use crate::codec::TILE_EXTENSION;
use crate::coord::TileCoord;

/// Maps tile coordinates to `<root>/<provider>/<style>/<z>/<x>/<y>.png`.
///
/// The extension is fixed by the codec, which always writes PNG.
///
/// The mapping is injective: distinct coordinates always produce distinct
/// paths under the same layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileLayout {
    root: PathBuf,
    provider: String,
    style: String,
}

impl TileLayout {
    pub fn new(
        root: impl AsRef<Path>,
        provider: impl Into<String>,
        style: impl Into<String>,
    ) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            provider: provider.into(),
            style: style.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding every row of the tile's column.
    pub fn tile_dir(&self, coord: &TileCoord) -> PathBuf {
        self.root
            .join(&self.provider)
            .join(&self.style)
            .join(coord.zoom.to_string())
            .join(coord.x.to_string())
    }

    pub fn tile_path(&self, coord: &TileCoord) -> PathBuf {
        self.tile_dir(coord)
            .join(format!("{}.{}", coord.y, TILE_EXTENSION))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_path_layout() {
        let layout = TileLayout::new("/maps", "thunderforest", "atlas");
        let path = layout.tile_path(&TileCoord::new(12, 1205, 1539));
        assert_eq!(
            path,
            PathBuf::from("/maps/thunderforest/atlas/12/1205/1539.png")
        );
    }

    #[test]
    fn test_extension_matches_codec_output() {
        let layout = TileLayout::new("/maps", "p", "s");
        let path = layout.tile_path(&TileCoord::new(3, 1, 2));
        assert_eq!(
            path.extension().and_then(|e| e.to_str()),
            Some(TILE_EXTENSION)
        );
        assert_eq!(
            image::ImageFormat::from_path(&path).unwrap(),
            image::ImageFormat::Png
        );
    }

    #[test]
    fn test_paths_are_distinct() {
        let layout = TileLayout::new("/maps", "p", "s");
        // Swapping x and y, or moving a digit between fields, never collides
        let a = layout.tile_path(&TileCoord::new(1, 2, 3));
        let b = layout.tile_path(&TileCoord::new(1, 3, 2));
        let c = layout.tile_path(&TileCoord::new(12, 3, 1));
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(b, c);
    }
}
