//! HSV color segmentation.
//!
//! Converts an RGB color frame to hue-saturation-value and produces a binary
//! mask selecting pixels inside a configured [`ColorBand`]. The conversion
//! follows the OpenCV 8-bit convention (H in `0..=179`, S and V in `0..=255`)
//! so band bounds tuned against OpenCV tooling carry over unchanged.
//!
//! The band test does not wrap around the hue origin. The default orange band
//! sits well inside `5..=15`, so wraparound handling is not needed; this is an
//! assumption of the shipped configuration, not a property of the module.

use image::{GrayImage, RgbImage};
use serde::{Deserialize, Serialize};

/// Mask value for an in-band pixel.
pub const MASK_SET: u8 = 255;

// ── Error type ─────────────────────────────────────────────────────────────

/// Errors that can occur during segmentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentError {
    /// The input color frame has zero width or height.
    EmptyImage,
}

impl std::fmt::Display for SegmentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyImage => write!(f, "input color frame is empty"),
        }
    }
}

impl std::error::Error for SegmentError {}

// ── Color band ─────────────────────────────────────────────────────────────

/// Inclusive acceptance region in HSV space.
///
/// Components are `[hue, saturation, value]` on the OpenCV 8-bit scale.
/// Configured once at startup; the segmenter never mutates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorBand {
    /// Lower bound, inclusive.
    pub lower: [u8; 3],
    /// Upper bound, inclusive.
    pub upper: [u8; 3],
}

impl Default for ColorBand {
    /// Orange band for a standard table-tennis ball.
    fn default() -> Self {
        Self {
            lower: [5, 100, 100],
            upper: [15, 255, 255],
        }
    }
}

impl ColorBand {
    /// Returns `true` when the band is well formed: component-wise ordered
    /// and with hue bounds inside the cyclic `0..=179` domain.
    pub fn is_valid(&self) -> bool {
        self.lower.iter().zip(&self.upper).all(|(lo, hi)| lo <= hi)
            && self.lower[0] <= 179
            && self.upper[0] <= 179
    }

    /// Inclusive component-wise membership test.
    #[inline]
    pub fn contains(&self, hsv: [u8; 3]) -> bool {
        (0..3).all(|i| self.lower[i] <= hsv[i] && hsv[i] <= self.upper[i])
    }
}

// ── Conversion and masking ─────────────────────────────────────────────────

/// Convert one RGB pixel to HSV on the OpenCV 8-bit scale.
#[inline]
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> [u8; 3] {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let v = max;
    let diff = (max - min) as i32;
    if diff == 0 {
        return [0, 0, v];
    }

    let s = (255 * diff + (max as i32) / 2) / max as i32;

    // Hue in degrees, then halved into 0..=179.
    let (ri, gi, bi) = (r as i32, g as i32, b as i32);
    let h_deg = if max == r {
        60 * (gi - bi) / diff
    } else if max == g {
        120 + 60 * (bi - ri) / diff
    } else {
        240 + 60 * (ri - gi) / diff
    };
    let h_deg = (h_deg + 360) % 360;
    [(h_deg / 2) as u8, s as u8, v]
}

/// Produce a binary mask selecting pixels whose HSV representation falls
/// inside `band` (inclusive bounds).
///
/// Pure function of the frame and the band; allocates a fresh mask aligned
/// 1:1 with the input pixel grid. Fails only for an empty input frame.
pub fn hsv_mask(color: &RgbImage, band: &ColorBand) -> Result<GrayImage, SegmentError> {
    let (w, h) = color.dimensions();
    if w == 0 || h == 0 {
        return Err(SegmentError::EmptyImage);
    }

    let mut mask = GrayImage::new(w, h);
    for (x, y, px) in color.enumerate_pixels() {
        let hsv = rgb_to_hsv(px[0], px[1], px[2]);
        if band.contains(hsv) {
            mask.put_pixel(x, y, image::Luma([MASK_SET]));
        }
    }
    Ok(mask)
}
