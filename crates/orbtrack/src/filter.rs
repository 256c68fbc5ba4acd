//! Optional temporal smoothing between localization and encoding.
//!
//! Each cycle's 3D point is independent by design; when jitter reduction is
//! wanted, this explicit exponential smoother is inserted as a separate stage
//! rather than folded into the localizer. Disabled by default.

use nalgebra::Point3;

/// First-order exponential smoother over camera-space points.
///
/// `alpha` is the weight of the newest sample: 1.0 passes points through
/// unchanged, values toward 0.0 smooth more aggressively.
#[derive(Debug, Clone)]
pub struct ExpSmoother {
    alpha: f64,
    state: Option<Point3<f64>>,
}

impl ExpSmoother {
    /// Create a smoother; `alpha` is clamped into `(0, 1]`.
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha: alpha.clamp(f64::EPSILON, 1.0),
            state: None,
        }
    }

    /// Fold in a new sample and return the smoothed point.
    ///
    /// The first sample initializes the state and is returned unchanged.
    pub fn apply(&mut self, point: Point3<f64>) -> Point3<f64> {
        let next = match self.state {
            None => point,
            Some(prev) => Point3::from(prev.coords.lerp(&point.coords, self.alpha)),
        };
        self.state = Some(next);
        next
    }

    /// Drop accumulated state, e.g. after a long detection gap.
    pub fn reset(&mut self) {
        self.state = None;
    }
}
