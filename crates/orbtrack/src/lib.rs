//! orbtrack — colored-ball 3D tracking over a depth camera, streamed to an
//! embedded controller.
//!
//! The per-frame pipeline stages are:
//!
//! 1. **Segment** – HSV conversion and color-band masking.
//! 2. **Detect** – circular blob extraction from the mask, either by contour
//!    fitting or by gradient-based circle voting.
//! 3. **Localize** – pinhole deprojection of the selected pixel with its
//!    aligned depth sample into a camera-space point.
//! 4. **Encode/Send** – fixed 7-byte little-endian millimeter frame written
//!    to the serial transport.
//!
//! [`runner::TrackLoop`] orchestrates the cycle; the depth camera and the
//! serial port are external collaborators behind the [`sensor::FrameSource`]
//! and [`transport::Transport`] traits.

pub mod camera;
pub mod config;
pub mod detect;
pub mod filter;
pub mod runner;
pub mod segment;
pub mod sensor;
pub mod transport;
pub mod wire;

#[cfg(test)]
pub(crate) mod test_utils;

pub use camera::{CameraIntrinsics, IntrinsicsError};
pub use config::{ConfigError, DetectorConfig, TrackConfig};
pub use detect::{Candidate, SelectionPolicy};
pub use filter::ExpSmoother;
pub use runner::{CycleOutcome, LoopStats, TrackLoop};
pub use segment::ColorBand;
pub use sensor::{AlignedFrame, DepthFrame, FrameSource, SensorError};
pub use transport::{RecordingTransport, Transport};
pub use wire::RangePolicy;
