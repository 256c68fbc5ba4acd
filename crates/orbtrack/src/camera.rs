//! Pinhole camera intrinsics and depth deprojection.
//!
//! Maps a 2D pixel plus a metric depth sample into a 3D camera-space point
//! (right-handed, Z forward). The camera is assumed pre-calibrated; the
//! intrinsics are read-only for the lifetime of a sensor session.

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

// ── Error type ─────────────────────────────────────────────────────────────

/// Errors produced by intrinsics validation.
#[derive(Debug, Clone, PartialEq)]
pub enum IntrinsicsError {
    /// Focal lengths are zero, non-finite, or missing.
    InvalidFocal {
        /// Configured focal length in x (pixels).
        fx: f64,
        /// Configured focal length in y (pixels).
        fy: f64,
    },
}

impl std::fmt::Display for IntrinsicsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidFocal { fx, fy } => {
                write!(f, "invalid focal lengths: fx={}, fy={}", fx, fy)
            }
        }
    }
}

impl std::error::Error for IntrinsicsError {}

// ── Intrinsics ─────────────────────────────────────────────────────────────

/// Pinhole camera intrinsics.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CameraIntrinsics {
    /// Focal length in x (pixels).
    pub fx: f64,
    /// Focal length in y (pixels).
    pub fy: f64,
    /// Principal point x (pixels).
    pub cx: f64,
    /// Principal point y (pixels).
    pub cy: f64,
}

impl CameraIntrinsics {
    /// Returns `true` when focal lengths are finite and non-zero.
    pub fn is_valid(self) -> bool {
        self.fx.is_finite()
            && self.fy.is_finite()
            && self.cx.is_finite()
            && self.cy.is_finite()
            && self.fx.abs() > 1e-12
            && self.fy.abs() > 1e-12
    }

    /// Validate at startup, before the frame loop is entered.
    pub fn validate(self) -> Result<Self, IntrinsicsError> {
        if self.is_valid() {
            Ok(self)
        } else {
            Err(IntrinsicsError::InvalidFocal {
                fx: self.fx,
                fy: self.fy,
            })
        }
    }

    /// Deproject a pixel with a metric depth sample into camera space:
    /// `X = (x - cx) * Z / fx`, `Y = (y - cy) * Z / fy`, `Z = depth_m`.
    ///
    /// A zero or non-finite depth means the sensor had no return at that
    /// pixel; the result would be degenerate, so `None` is returned and the
    /// caller is expected to skip the cycle rather than forward the point.
    pub fn deproject(self, pixel_xy: [f64; 2], depth_m: f64) -> Option<Point3<f64>> {
        if !self.is_valid() || !depth_m.is_finite() || depth_m <= 0.0 {
            return None;
        }
        let x = (pixel_xy[0] - self.cx) * depth_m / self.fx;
        let y = (pixel_xy[1] - self.cy) * depth_m / self.fy;
        Some(Point3::new(x, y, depth_m))
    }

    /// Project a camera-space point back to pixel coordinates.
    ///
    /// Inverse of [`deproject`](Self::deproject); used for round-trip checks.
    pub fn project(self, point: &Point3<f64>) -> Option<[f64; 2]> {
        if !self.is_valid() || point.z <= 0.0 {
            return None;
        }
        Some([
            self.fx * point.x / point.z + self.cx,
            self.fy * point.y / point.z + self.cy,
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intrinsics() -> CameraIntrinsics {
        CameraIntrinsics {
            fx: 600.0,
            fy: 600.0,
            cx: 320.0,
            cy: 240.0,
        }
    }

    #[test]
    fn zero_focal_fails_validation() {
        let intr = CameraIntrinsics {
            fx: 0.0,
            fy: 600.0,
            cx: 320.0,
            cy: 240.0,
        };
        assert!(intr.validate().is_err());
    }

    #[test]
    fn project_deproject_round_trip() {
        let intr = intrinsics();
        let original = Point3::new(0.1, 0.05, 1.0);
        let pixel = intr.project(&original).unwrap();
        let recovered = intr.deproject(pixel, original.z).unwrap();
        assert!((recovered.x - original.x).abs() < 1e-6);
        assert!((recovered.y - original.y).abs() < 1e-6);
        assert!((recovered.z - original.z).abs() < 1e-6);
    }

    #[test]
    fn zero_depth_yields_no_localization() {
        assert!(intrinsics().deproject([300.0, 200.0], 0.0).is_none());
        assert!(intrinsics().deproject([300.0, 200.0], f64::NAN).is_none());
    }

    #[test]
    fn principal_point_deprojects_onto_optical_axis() {
        let p = intrinsics().deproject([320.0, 240.0], 2.0).unwrap();
        assert_eq!(p, Point3::new(0.0, 0.0, 2.0));
    }
}
