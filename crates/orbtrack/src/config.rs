//! Pipeline configuration.
//!
//! One aggregate [`TrackConfig`] wires the per-stage configs together and is
//! validated once at startup, before the frame loop is entered. All fields
//! can be overridden after construction.

use serde::{Deserialize, Serialize};

use crate::detect::contour::{ContourConfig, ContourDetector};
use crate::detect::voting::{VotingConfig, VotingDetector};
use crate::detect::{BlobDetector, SelectionPolicy};
use crate::segment::ColorBand;
use crate::wire::RangePolicy;

// ── Error type ─────────────────────────────────────────────────────────────

/// Startup configuration errors; reported before the loop runs.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Color band bounds are inverted or out of the hue domain.
    InvalidColorBand(ColorBand),
    /// Contour area band is inverted or negative.
    InvalidAreaBand {
        /// Configured minimum area (pixels²).
        min_area: f32,
        /// Configured maximum area (pixels²).
        max_area: f32,
    },
    /// Voting radius band is inverted or non-positive.
    InvalidRadiusBand {
        /// Configured minimum radius (pixels).
        r_min: f32,
        /// Configured maximum radius (pixels).
        r_max: f32,
    },
    /// Smoothing factor outside `(0, 1]`.
    InvalidSmoothing(f64),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidColorBand(band) => write!(
                f,
                "malformed color band: lower {:?} upper {:?}",
                band.lower, band.upper
            ),
            Self::InvalidAreaBand { min_area, max_area } => {
                write!(f, "malformed area band: [{}, {}]", min_area, max_area)
            }
            Self::InvalidRadiusBand { r_min, r_max } => {
                write!(f, "malformed radius band: [{}, {}]", r_min, r_max)
            }
            Self::InvalidSmoothing(alpha) => {
                write!(f, "smoothing factor {} outside (0, 1]", alpha)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ── Detector selection ─────────────────────────────────────────────────────

/// Which detection strategy to run, with its configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum DetectorConfig {
    /// Contour following + minimum enclosing circle.
    Contour(ContourConfig),
    /// Gradient-based circle voting.
    Voting(VotingConfig),
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self::Contour(ContourConfig::default())
    }
}

impl DetectorConfig {
    /// Instantiate the configured strategy. The box is `Send` so the loop
    /// can run on a worker thread.
    pub fn build(&self) -> Box<dyn BlobDetector + Send> {
        match *self {
            Self::Contour(config) => Box::new(ContourDetector::new(config)),
            Self::Voting(config) => Box::new(VotingDetector::new(config)),
        }
    }
}

// ── Aggregate ──────────────────────────────────────────────────────────────

/// Top-level pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackConfig {
    /// HSV acceptance band for segmentation.
    pub band: ColorBand,
    /// Detection strategy and its tuning.
    pub detector: DetectorConfig,
    /// Candidate selection policy when several blobs are found.
    pub selection: SelectionPolicy,
    /// Encoder behavior for out-of-range coordinates.
    pub range_policy: RangePolicy,
    /// Optional exponential smoothing factor in `(0, 1]`; `None` disables
    /// temporal filtering.
    pub smoothing: Option<f64>,
    /// Frame wait bound in milliseconds; a timeout skips the cycle.
    pub frame_timeout_ms: u64,
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self {
            band: ColorBand::default(),
            detector: DetectorConfig::default(),
            selection: SelectionPolicy::default(),
            range_policy: RangePolicy::default(),
            smoothing: None,
            frame_timeout_ms: 1000,
        }
    }
}

impl TrackConfig {
    /// Validate all stage configs. Called once at loop construction.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.band.is_valid() {
            return Err(ConfigError::InvalidColorBand(self.band));
        }
        match self.detector {
            DetectorConfig::Contour(c) if !c.is_valid() => {
                return Err(ConfigError::InvalidAreaBand {
                    min_area: c.min_area,
                    max_area: c.max_area,
                });
            }
            DetectorConfig::Voting(v) if !v.is_valid() => {
                return Err(ConfigError::InvalidRadiusBand {
                    r_min: v.r_min,
                    r_max: v.r_max,
                });
            }
            _ => {}
        }
        if let Some(alpha) = self.smoothing {
            if !(alpha > 0.0 && alpha <= 1.0) {
                return Err(ConfigError::InvalidSmoothing(alpha));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(TrackConfig::default().validate().is_ok());
    }

    #[test]
    fn inverted_color_band_fails_fast() {
        let config = TrackConfig {
            band: ColorBand {
                lower: [20, 0, 0],
                upper: [10, 255, 255],
            },
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidColorBand(_))
        ));
    }

    #[test]
    fn inverted_area_band_fails_fast() {
        let config = TrackConfig {
            detector: DetectorConfig::Contour(ContourConfig {
                min_area: 500.0,
                max_area: 100.0,
            }),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidAreaBand { .. })
        ));
    }

    #[test]
    fn out_of_range_smoothing_fails_fast() {
        let config = TrackConfig {
            smoothing: Some(1.5),
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidSmoothing(1.5)));
    }
}
