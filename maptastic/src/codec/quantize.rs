//! Median-cut palette quantization.
//!
//! Reduces an RGB image to at most `max_colors` representative colours.
//! Works on the colour histogram rather than on individual pixels, so the
//! cost is driven by the number of distinct colours in the tile.

use std::collections::HashMap;

use image::RgbImage;

/// Largest palette an 8-bit indexed PNG can carry.
pub const MAX_PALETTE_SIZE: usize = 256;

/// An image expressed as palette indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedImage {
    pub width: u32,
    pub height: u32,
    /// Palette entries, at most [`MAX_PALETTE_SIZE`].
    pub palette: Vec<[u8; 3]>,
    /// One palette index per pixel, row-major.
    pub indices: Vec<u8>,
}

impl IndexedImage {
    /// Palette flattened to `RGBRGB...` as PNG `PLTE` expects.
    pub fn palette_bytes(&self) -> Vec<u8> {
        self.palette.iter().flatten().copied().collect()
    }
}

#[derive(Debug, Clone, Copy)]
struct ColorCount {
    rgb: [u8; 3],
    count: u32,
}

/// A box of histogram entries in colour space.
struct ColorBox {
    colors: Vec<ColorCount>,
}

impl ColorBox {
    /// Widest channel and its extent.
    fn widest_channel(&self) -> (usize, u8) {
        let mut lo = [u8::MAX; 3];
        let mut hi = [u8::MIN; 3];
        for c in &self.colors {
            for ch in 0..3 {
                lo[ch] = lo[ch].min(c.rgb[ch]);
                hi[ch] = hi[ch].max(c.rgb[ch]);
            }
        }
        (0..3)
            .map(|ch| (ch, hi[ch] - lo[ch]))
            .max_by_key(|&(_, range)| range)
            .unwrap_or((0, 0))
    }

    fn pixel_count(&self) -> u64 {
        self.colors.iter().map(|c| c.count as u64).sum()
    }

    /// Split at the pixel-weighted median of the widest channel.
    ///
    /// Both halves are non-empty; callers only split boxes holding at
    /// least two colours.
    fn split(mut self) -> (ColorBox, ColorBox) {
        let (channel, _) = self.widest_channel();
        self.colors.sort_unstable_by_key(|c| c.rgb[channel]);

        let half = self.pixel_count().div_ceil(2);
        let mut seen = 0u64;
        let mut at = self.colors.len() - 1;
        for (i, c) in self.colors.iter().enumerate() {
            seen += c.count as u64;
            if seen >= half {
                at = i + 1;
                break;
            }
        }
        let at = at.clamp(1, self.colors.len() - 1);

        let upper = self.colors.split_off(at);
        (self, ColorBox { colors: upper })
    }

    /// Pixel-weighted mean colour.
    fn average(&self) -> [u8; 3] {
        let total = self.pixel_count().max(1);
        let mut sum = [0u64; 3];
        for c in &self.colors {
            for ch in 0..3 {
                sum[ch] += c.rgb[ch] as u64 * c.count as u64;
            }
        }
        [
            ((sum[0] + total / 2) / total) as u8,
            ((sum[1] + total / 2) / total) as u8,
            ((sum[2] + total / 2) / total) as u8,
        ]
    }
}

/// Quantize `image` to at most `max_colors` colours using median cut.
///
/// `max_colors` is clamped to `1..=256`. Images that already fit the
/// palette are mapped exactly.
pub fn median_cut(image: &RgbImage, max_colors: usize) -> IndexedImage {
    let max_colors = max_colors.clamp(1, MAX_PALETTE_SIZE);

    let mut histogram: HashMap<[u8; 3], u32> = HashMap::new();
    for pixel in image.pixels() {
        *histogram.entry(pixel.0).or_insert(0) += 1;
    }

    let mut colors: Vec<ColorCount> = histogram
        .into_iter()
        .map(|(rgb, count)| ColorCount { rgb, count })
        .collect();
    // Deterministic palette order regardless of hash iteration
    colors.sort_unstable_by_key(|c| c.rgb);

    let mut boxes = vec![ColorBox { colors }];
    while boxes.len() < max_colors {
        let candidate = boxes
            .iter()
            .enumerate()
            .filter(|(_, b)| b.colors.len() > 1)
            .max_by_key(|(_, b)| (b.widest_channel().1, b.pixel_count()))
            .map(|(i, _)| i);

        let Some(index) = candidate else {
            break;
        };
        let (lower, upper) = boxes.swap_remove(index).split();
        boxes.push(lower);
        boxes.push(upper);
    }

    let mut palette = Vec::with_capacity(boxes.len());
    let mut lookup: HashMap<[u8; 3], u8> = HashMap::new();
    for (index, color_box) in boxes.iter().enumerate() {
        palette.push(color_box.average());
        for c in &color_box.colors {
            lookup.insert(c.rgb, index as u8);
        }
    }

    let indices = image
        .pixels()
        .map(|p| lookup.get(&p.0).copied().unwrap_or(0))
        .collect();

    IndexedImage {
        width: image.width(),
        height: image.height(),
        palette,
        indices,
    }
}
