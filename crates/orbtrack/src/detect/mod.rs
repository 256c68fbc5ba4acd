//! Circular blob detection on a segmentation mask.
//!
//! Two interchangeable strategies implement [`BlobDetector`]:
//!
//! - [`contour::ContourDetector`] — border following + area band filter +
//!   minimum enclosing circle of each surviving boundary.
//! - [`voting::VotingDetector`] — gradient-based radial voting over the
//!   masked intensity channel, confidence-ordered peaks.
//!
//! Neither strategy errors on a well-formed image; absence of detection is an
//! empty candidate list. Which candidate the pipeline acts on is decided by
//! an explicit [`SelectionPolicy`], never by discovery order.

use image::GrayImage;
use serde::{Deserialize, Serialize};

pub mod contour;
pub mod voting;

/// A detected circular blob in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Center x (pixels).
    pub x: i32,
    /// Center y (pixels).
    pub y: i32,
    /// Radius (pixels).
    pub radius: u32,
    /// Strategy-specific score: boundary area in pixels² for the contour
    /// strategy, accumulator votes for the voting strategy. Comparable only
    /// within one strategy's output.
    pub score: f32,
}

/// Capability shared by both detection strategies.
///
/// `mask` is the binary segmentation mask; `gray` the intensity channel of
/// the raw frame, aligned 1:1 with the mask. The contour strategy ignores
/// `gray`, the voting strategy uses it to suppress background gradients.
pub trait BlobDetector {
    /// Return zero or more candidates for one frame.
    fn detect(&self, mask: &GrayImage, gray: &GrayImage) -> Vec<Candidate>;
}

/// Which candidate the frame loop forwards when several are found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SelectionPolicy {
    /// Candidate with the highest strategy score.
    #[default]
    HighestScore,
    /// Candidate with the largest pixel radius.
    LargestRadius,
}

/// Select exactly one candidate according to `policy`.
///
/// Ties keep the earlier candidate, which makes selection deterministic for
/// a fixed detector output order.
pub fn select(candidates: &[Candidate], policy: SelectionPolicy) -> Option<&Candidate> {
    match policy {
        SelectionPolicy::HighestScore => candidates
            .iter()
            .reduce(|best, c| if c.score > best.score { c } else { best }),
        SelectionPolicy::LargestRadius => candidates
            .iter()
            .reduce(|best, c| if c.radius > best.radius { c } else { best }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cand(x: i32, radius: u32, score: f32) -> Candidate {
        Candidate {
            x,
            y: 0,
            radius,
            score,
        }
    }

    #[test]
    fn empty_input_selects_nothing() {
        assert!(select(&[], SelectionPolicy::HighestScore).is_none());
    }

    #[test]
    fn highest_score_wins_regardless_of_order() {
        let cands = [cand(0, 10, 1.0), cand(1, 5, 9.0), cand(2, 30, 4.0)];
        assert_eq!(select(&cands, SelectionPolicy::HighestScore).unwrap().x, 1);
    }

    #[test]
    fn largest_radius_policy_ignores_score() {
        let cands = [cand(0, 10, 9.0), cand(1, 30, 1.0)];
        assert_eq!(select(&cands, SelectionPolicy::LargestRadius).unwrap().x, 1);
    }

    #[test]
    fn ties_keep_the_earlier_candidate() {
        let cands = [cand(0, 10, 5.0), cand(1, 10, 5.0)];
        assert_eq!(select(&cands, SelectionPolicy::HighestScore).unwrap().x, 0);
    }
}
