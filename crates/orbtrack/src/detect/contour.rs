//! Contour-based circle detection.
//!
//! Follows the outer borders of connected mask regions, discards regions
//! whose boundary area falls outside a configured band, and fits the minimum
//! enclosing circle to each surviving boundary. Candidates are returned in
//! border traversal order with their area as the score.

use image::GrayImage;
use imageproc::contours::{find_contours, BorderType};
use rand::prelude::SliceRandom;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use super::{BlobDetector, Candidate};

/// Configuration for the contour strategy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ContourConfig {
    /// Minimum accepted region area (pixels²); rejects noise specks.
    pub min_area: f32,
    /// Maximum accepted region area (pixels²); rejects oversized regions.
    pub max_area: f32,
}

impl Default for ContourConfig {
    fn default() -> Self {
        Self {
            min_area: 1000.0,
            max_area: 10_000.0,
        }
    }
}

impl ContourConfig {
    /// Returns `true` when the area band is ordered and non-negative.
    pub fn is_valid(&self) -> bool {
        self.min_area >= 0.0 && self.min_area <= self.max_area
    }
}

/// Contour-based [`BlobDetector`].
#[derive(Debug, Clone, Default)]
pub struct ContourDetector {
    /// Area band filter.
    pub config: ContourConfig,
}

impl ContourDetector {
    pub fn new(config: ContourConfig) -> Self {
        Self { config }
    }
}

impl BlobDetector for ContourDetector {
    fn detect(&self, mask: &GrayImage, _gray: &GrayImage) -> Vec<Candidate> {
        let mut candidates = Vec::new();
        for contour in find_contours::<i32>(mask) {
            if contour.border_type != BorderType::Outer {
                continue;
            }
            let points: Vec<[f64; 2]> = contour
                .points
                .iter()
                .map(|p| [p.x as f64, p.y as f64])
                .collect();
            let area = polygon_area(&points) as f32;
            if area < self.config.min_area || area > self.config.max_area {
                continue;
            }
            let Some((center, radius)) = min_enclosing_circle(&points) else {
                continue;
            };
            candidates.push(Candidate {
                x: center[0].round() as i32,
                y: center[1].round() as i32,
                radius: radius.round().max(0.0) as u32,
                score: area,
            });
        }
        tracing::debug!(
            "{} contour candidates within area band [{}, {}]",
            candidates.len(),
            self.config.min_area,
            self.config.max_area,
        );
        candidates
    }
}

/// Shoelace area of a closed pixel boundary.
fn polygon_area(points: &[[f64; 2]]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut twice = 0.0;
    for i in 0..points.len() {
        let [x0, y0] = points[i];
        let [x1, y1] = points[(i + 1) % points.len()];
        twice += x0 * y1 - x1 * y0;
    }
    twice.abs() * 0.5
}

// ── Minimum enclosing circle ───────────────────────────────────────────────

const MEC_EPS: f64 = 1e-7;

#[derive(Debug, Clone, Copy)]
struct Circle {
    cx: f64,
    cy: f64,
    r: f64,
}

impl Circle {
    fn contains(&self, p: [f64; 2]) -> bool {
        let dx = p[0] - self.cx;
        let dy = p[1] - self.cy;
        (dx * dx + dy * dy).sqrt() <= self.r + MEC_EPS
    }
}

fn circle_from_2(a: [f64; 2], b: [f64; 2]) -> Circle {
    let cx = 0.5 * (a[0] + b[0]);
    let cy = 0.5 * (a[1] + b[1]);
    let r = 0.5 * ((a[0] - b[0]).hypot(a[1] - b[1]));
    Circle { cx, cy, r }
}

fn circle_from_3(a: [f64; 2], b: [f64; 2], c: [f64; 2]) -> Circle {
    let d = 2.0 * (a[0] * (b[1] - c[1]) + b[0] * (c[1] - a[1]) + c[0] * (a[1] - b[1]));
    if d.abs() < 1e-12 {
        // Collinear: fall back to the widest diametral pair.
        let ab = circle_from_2(a, b);
        let ac = circle_from_2(a, c);
        let bc = circle_from_2(b, c);
        let mut widest = ab;
        for cand in [ac, bc] {
            if cand.r > widest.r {
                widest = cand;
            }
        }
        return widest;
    }
    let a2 = a[0] * a[0] + a[1] * a[1];
    let b2 = b[0] * b[0] + b[1] * b[1];
    let c2 = c[0] * c[0] + c[1] * c[1];
    let cx = (a2 * (b[1] - c[1]) + b2 * (c[1] - a[1]) + c2 * (a[1] - b[1])) / d;
    let cy = (a2 * (c[0] - b[0]) + b2 * (a[0] - c[0]) + c2 * (b[0] - a[0])) / d;
    let r = (a[0] - cx).hypot(a[1] - cy);
    Circle { cx, cy, r }
}

/// Welzl's incremental minimum enclosing circle.
///
/// Points are shuffled with a fixed seed so the expected-linear behavior does
/// not depend on the border traversal order.
fn min_enclosing_circle(points: &[[f64; 2]]) -> Option<([f64; 2], f64)> {
    if points.is_empty() {
        return None;
    }
    let mut pts = points.to_vec();
    let mut rng = StdRng::seed_from_u64(17);
    pts.shuffle(&mut rng);

    let mut circle = Circle {
        cx: pts[0][0],
        cy: pts[0][1],
        r: 0.0,
    };
    for i in 1..pts.len() {
        if circle.contains(pts[i]) {
            continue;
        }
        circle = Circle {
            cx: pts[i][0],
            cy: pts[i][1],
            r: 0.0,
        };
        for j in 0..i {
            if circle.contains(pts[j]) {
                continue;
            }
            circle = circle_from_2(pts[i], pts[j]);
            for k in 0..j {
                if !circle.contains(pts[k]) {
                    circle = circle_from_3(pts[i], pts[j], pts[k]);
                }
            }
        }
    }
    Some(([circle.cx, circle.cy], circle.r))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::draw_disk_mask;

    #[test]
    fn solid_disk_yields_one_centered_candidate() {
        let mask = draw_disk_mask(160, 120, [80.0, 60.0], 20.0);
        let det = ContourDetector::new(ContourConfig {
            min_area: 500.0,
            max_area: 5000.0,
        });
        let cands = det.detect(&mask, &mask);
        assert_eq!(cands.len(), 1);
        let c = cands[0];
        assert!((c.x - 80).abs() <= 2, "center x = {}", c.x);
        assert!((c.y - 60).abs() <= 2, "center y = {}", c.y);
        let rel = (c.radius as f32 - 20.0).abs() / 20.0;
        assert!(rel <= 0.15, "radius = {} ({}% off)", c.radius, rel * 100.0);
    }

    #[test]
    fn area_band_is_never_violated() {
        // One small speck and one large disk; band admits neither.
        let mut mask = draw_disk_mask(200, 200, [100.0, 100.0], 55.0);
        mask.put_pixel(5, 5, image::Luma([255]));
        let det = ContourDetector::new(ContourConfig {
            min_area: 100.0,
            max_area: 2000.0,
        });
        assert!(det.detect(&mask, &mask).is_empty());

        // Widen the band: only the disk passes, and its area is inside it.
        let det = ContourDetector::new(ContourConfig {
            min_area: 100.0,
            max_area: 20_000.0,
        });
        let cands = det.detect(&mask, &mask);
        assert_eq!(cands.len(), 1);
        assert!(cands[0].score >= 100.0 && cands[0].score <= 20_000.0);
    }

    #[test]
    fn empty_mask_yields_no_candidates() {
        let mask = GrayImage::new(64, 64);
        let det = ContourDetector::default();
        assert!(det.detect(&mask, &mask).is_empty());
    }

    #[test]
    fn two_disks_yield_two_candidates() {
        let mut mask = draw_disk_mask(240, 120, [60.0, 60.0], 20.0);
        let second = draw_disk_mask(240, 120, [180.0, 60.0], 15.0);
        for (a, b) in mask.iter_mut().zip(second.iter()) {
            *a = (*a).max(*b);
        }
        let det = ContourDetector::new(ContourConfig {
            min_area: 300.0,
            max_area: 5000.0,
        });
        assert_eq!(det.detect(&mask, &mask).len(), 2);
    }

    #[test]
    fn min_enclosing_circle_of_a_square() {
        let pts = [[0.0, 0.0], [2.0, 0.0], [2.0, 2.0], [0.0, 2.0]];
        let (center, r) = min_enclosing_circle(&pts).unwrap();
        assert!((center[0] - 1.0).abs() < 1e-6);
        assert!((center[1] - 1.0).abs() < 1e-6);
        assert!((r - std::f64::consts::SQRT_2).abs() < 1e-6);
    }

    #[test]
    fn min_enclosing_circle_of_collinear_points() {
        let pts = [[0.0, 0.0], [1.0, 0.0], [4.0, 0.0]];
        let (center, r) = min_enclosing_circle(&pts).unwrap();
        assert!((center[0] - 2.0).abs() < 1e-6);
        assert!((r - 2.0).abs() < 1e-6);
    }
}
