//! Gradient-voting circle detection.
//!
//! The mask is dilated to merge fragmented regions, then multiplied against
//! the intensity channel of the raw frame so that only in-band structure
//! contributes gradients. For each strong-gradient pixel, votes are cast
//! along both gradient directions at distances in `[r_min, r_max]`; a filled
//! disk produces an accumulator peak at its center because boundary gradients
//! converge radially. Peaks are extracted with non-maximum suppression and
//! returned ordered by vote score (highest first). No peak clearing the
//! threshold is an empty result, not an error.

use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;
use serde::{Deserialize, Serialize};

use super::{BlobDetector, Candidate};

/// Configuration for the voting strategy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct VotingConfig {
    /// Minimum voting radius (pixels).
    pub r_min: f32,
    /// Maximum voting radius (pixels).
    pub r_max: f32,
    /// LInf dilation radius applied to the mask before modulation (pixels).
    pub dilate_px: u8,
    /// Gradient magnitude threshold (fraction of max gradient).
    pub grad_threshold: f32,
    /// NMS radius for peak extraction (pixels).
    pub nms_radius: f32,
    /// Minimum accumulator value for a candidate (fraction of max).
    pub min_vote_frac: f32,
    /// Gaussian sigma for accumulator smoothing.
    pub accum_sigma: f32,
    /// Optional cap on number of candidates returned (after score sorting).
    pub max_candidates: Option<usize>,
}

impl Default for VotingConfig {
    fn default() -> Self {
        Self {
            r_min: 8.0,
            r_max: 60.0,
            dilate_px: 2,
            grad_threshold: 0.05,
            nms_radius: 8.0,
            min_vote_frac: 0.25,
            accum_sigma: 2.0,
            max_candidates: Some(4),
        }
    }
}

impl VotingConfig {
    /// Returns `true` when the radius band is ordered and positive.
    pub fn is_valid(&self) -> bool {
        self.r_min > 0.0 && self.r_min <= self.r_max
    }
}

/// Voting-based [`BlobDetector`].
#[derive(Debug, Clone, Default)]
pub struct VotingDetector {
    /// Accumulator and peak extraction controls.
    pub config: VotingConfig,
}

impl VotingDetector {
    pub fn new(config: VotingConfig) -> Self {
        Self { config }
    }
}

impl BlobDetector for VotingDetector {
    fn detect(&self, mask: &GrayImage, gray: &GrayImage) -> Vec<Candidate> {
        let config = &self.config;
        let (w, h) = mask.dimensions();
        if w < 4 || h < 4 || gray.dimensions() != (w, h) || !config.is_valid() {
            return Vec::new();
        }

        // Merge fragmented regions, then keep intensity only where the
        // (dilated) mask is set.
        let dilated = if config.dilate_px > 0 {
            imageproc::morphology::dilate(mask, Norm::LInf, config.dilate_px)
        } else {
            mask.clone()
        };
        let mut modulated = GrayImage::new(w, h);
        for (x, y, px) in modulated.enumerate_pixels_mut() {
            if dilated.get_pixel(x, y)[0] > 0 {
                *px = *gray.get_pixel(x, y);
            }
        }

        // Scharr gradients (i16 output)
        let gx = imageproc::gradients::horizontal_scharr(&modulated);
        let gy = imageproc::gradients::vertical_scharr(&modulated);
        let gx_raw = gx.as_raw();
        let gy_raw = gy.as_raw();

        let mut max_mag_sq: f32 = 0.0;
        for (&gxv, &gyv) in gx_raw.iter().zip(gy_raw.iter()) {
            let mag_sq = (gxv as f32).powi(2) + (gyv as f32).powi(2);
            if mag_sq > max_mag_sq {
                max_mag_sq = mag_sq;
            }
        }
        let max_mag = max_mag_sq.sqrt();
        if max_mag < 1e-6 {
            return Vec::new();
        }
        let threshold_sq = (config.grad_threshold * max_mag).powi(2);

        // Vote accumulation along both gradient directions.
        let stride = w as usize;
        let mut accum = vec![0.0f32; stride * h as usize];
        let mut radii = Vec::new();
        let mut r = config.r_min;
        while r <= config.r_max {
            radii.push(r);
            r += 1.0;
        }
        let x_limit = (w - 1) as f32;
        let y_limit = (h - 1) as f32;

        for y in 0..h as usize {
            let yf = y as f32;
            for x in 0..stride {
                let idx = y * stride + x;
                let gxv = gx_raw[idx] as f32;
                let gyv = gy_raw[idx] as f32;
                let mag_sq = gxv * gxv + gyv * gyv;
                if mag_sq < threshold_sq {
                    continue;
                }
                let mag = mag_sq.sqrt();
                let inv_mag = 1.0 / mag;
                let dx = gxv * inv_mag;
                let dy = gyv * inv_mag;
                let xf = x as f32;

                for &r in &radii {
                    let vx = xf + dx * r;
                    let vy = yf + dy * r;
                    if vx >= 0.0 && vx < x_limit && vy >= 0.0 && vy < y_limit {
                        bilinear_add(&mut accum, stride, vx, vy, mag);
                    }
                    let vx = xf - dx * r;
                    let vy = yf - dy * r;
                    if vx >= 0.0 && vx < x_limit && vy >= 0.0 && vy < y_limit {
                        bilinear_add(&mut accum, stride, vx, vy, mag);
                    }
                }
            }
        }

        // Smooth the accumulator before peak extraction.
        let accum_img = image::ImageBuffer::<Luma<f32>, Vec<f32>>::from_raw(w, h, accum)
            .expect("accumulator dimensions match");
        let smoothed = imageproc::filter::gaussian_blur_f32(&accum_img, config.accum_sigma);
        let smoothed = smoothed.as_raw();

        let max_val = smoothed.iter().cloned().fold(0.0f32, f32::max);
        if max_val < 1e-6 {
            return Vec::new();
        }
        let vote_threshold = config.min_vote_frac * max_val;

        // Non-maximum suppression over the NMS radius.
        let nms_r = config.nms_radius.ceil() as i32;
        let nms_r_sq = config.nms_radius * config.nms_radius;
        let mut offsets = Vec::new();
        for dy in -nms_r..=nms_r {
            for dx in -nms_r..=nms_r {
                if (dx == 0 && dy == 0) || (dx * dx + dy * dy) as f32 > nms_r_sq {
                    continue;
                }
                offsets.push(dy as isize * stride as isize + dx as isize);
            }
        }

        let mut candidates = Vec::new();
        for y in nms_r..(h as i32 - nms_r) {
            for x in nms_r..(w as i32 - nms_r) {
                let idx = y as usize * stride + x as usize;
                let val = smoothed[idx];
                if val < vote_threshold {
                    continue;
                }
                let mut is_max = true;
                for &off in &offsets {
                    let nidx = idx.wrapping_add_signed(off);
                    if smoothed[nidx] > val || (smoothed[nidx] == val && nidx < idx) {
                        is_max = false;
                        break;
                    }
                }
                if !is_max {
                    continue;
                }
                let Some(radius) = estimate_radius(mask, x, y, config) else {
                    continue;
                };
                candidates.push(Candidate {
                    x,
                    y,
                    radius,
                    score: val,
                });
            }
        }

        candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
        if let Some(cap) = config.max_candidates {
            candidates.truncate(cap);
        }
        tracing::debug!("{} voting candidates above threshold", candidates.len());
        candidates
    }
}

/// Deposit a weighted vote into the accumulator using bilinear interpolation.
#[inline]
fn bilinear_add(accum: &mut [f32], stride: usize, x: f32, y: f32, weight: f32) {
    let x0 = x as usize;
    let y0 = y as usize;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;
    let base = y0 * stride + x0;
    accum[base] += weight * (1.0 - fx) * (1.0 - fy);
    accum[base + 1] += weight * fx * (1.0 - fy);
    accum[base + stride] += weight * (1.0 - fx) * fy;
    accum[base + stride + 1] += weight * fx * fy;
}

/// Recover a pixel radius from the mask around an accumulator peak.
///
/// Counts set mask pixels within `r_max` of the peak and inverts the disk
/// area formula. Returns `None` when the peak has no mask support at all.
fn estimate_radius(mask: &GrayImage, cx: i32, cy: i32, config: &VotingConfig) -> Option<u32> {
    let (w, h) = mask.dimensions();
    let reach = config.r_max.ceil() as i32;
    let reach_sq = config.r_max * config.r_max;
    let mut count = 0u32;
    for dy in -reach..=reach {
        let y = cy + dy;
        if y < 0 || y >= h as i32 {
            continue;
        }
        for dx in -reach..=reach {
            let x = cx + dx;
            if x < 0 || x >= w as i32 {
                continue;
            }
            if (dx * dx + dy * dy) as f32 > reach_sq {
                continue;
            }
            if mask.get_pixel(x as u32, y as u32)[0] > 0 {
                count += 1;
            }
        }
    }
    if count == 0 {
        return None;
    }
    let r = (count as f32 / std::f32::consts::PI).sqrt();
    Some(r.clamp(config.r_min, config.r_max).round() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{draw_disk_gray, draw_disk_mask};

    fn config() -> VotingConfig {
        VotingConfig {
            r_min: 10.0,
            r_max: 32.0,
            dilate_px: 1,
            grad_threshold: 0.05,
            nms_radius: 10.0,
            min_vote_frac: 0.3,
            accum_sigma: 2.0,
            max_candidates: Some(4),
        }
    }

    #[test]
    fn bright_disk_yields_one_centered_candidate() {
        let mask = draw_disk_mask(160, 120, [80.0, 60.0], 20.0);
        let gray = draw_disk_gray(160, 120, [80.0, 60.0], 20.0, 220, 20);
        let det = VotingDetector::new(config());
        let cands = det.detect(&mask, &gray);
        assert!(!cands.is_empty(), "disk should produce a peak");
        let c = cands[0];
        assert!((c.x - 80).abs() <= 2, "center x = {}", c.x);
        assert!((c.y - 60).abs() <= 2, "center y = {}", c.y);
        let rel = (c.radius as f32 - 20.0).abs() / 20.0;
        assert!(rel <= 0.15, "radius = {} ({}% off)", c.radius, rel * 100.0);
    }

    #[test]
    fn blank_frame_is_empty_not_an_error() {
        let mask = GrayImage::new(120, 120);
        let gray = GrayImage::new(120, 120);
        let det = VotingDetector::new(config());
        assert!(det.detect(&mask, &gray).is_empty());
    }

    #[test]
    fn candidates_are_ordered_by_score() {
        // Strong disk and a weaker, smaller one.
        let mut mask = draw_disk_mask(240, 120, [70.0, 60.0], 22.0);
        let second = draw_disk_mask(240, 120, [180.0, 60.0], 12.0);
        for (a, b) in mask.iter_mut().zip(second.iter()) {
            *a = (*a).max(*b);
        }
        let mut gray = draw_disk_gray(240, 120, [70.0, 60.0], 22.0, 230, 15);
        let gray2 = draw_disk_gray(240, 120, [180.0, 60.0], 12.0, 120, 15);
        for (a, b) in gray.iter_mut().zip(gray2.iter()) {
            *a = (*a).max(*b);
        }
        let det = VotingDetector::new(VotingConfig {
            min_vote_frac: 0.1,
            ..config()
        });
        let cands = det.detect(&mask, &gray);
        for pair in cands.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn mismatched_dimensions_yield_empty() {
        let mask = GrayImage::new(64, 64);
        let gray = GrayImage::new(32, 32);
        let det = VotingDetector::new(config());
        assert!(det.detect(&mask, &gray).is_empty());
    }
}
