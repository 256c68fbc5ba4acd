//! Frame acquisition interface.
//!
//! The depth camera is an external collaborator: the pipeline only needs a
//! blocking "give me the next aligned color+depth pair" call with a timeout.
//! [`FrameSource`] captures that contract; the `realsense` cargo feature
//! provides a librealsense2-backed implementation, and tests drive the loop
//! with scripted sources.

use std::time::Duration;

use image::RgbImage;

// ── Error type ─────────────────────────────────────────────────────────────

/// Errors produced by frame acquisition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SensorError {
    /// No frame pair arrived within the configured wait.
    Timeout,
    /// No depth camera is connected. Fatal at startup.
    NoDevice,
    /// The device stopped delivering frames mid-session.
    Disconnected(String),
}

impl std::fmt::Display for SensorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout => write!(f, "timed out waiting for an aligned frame"),
            Self::NoDevice => write!(f, "no depth camera device found"),
            Self::Disconnected(msg) => write!(f, "depth camera disconnected: {}", msg),
        }
    }
}

impl std::error::Error for SensorError {}

// ── Frame types ────────────────────────────────────────────────────────────

/// One depth frame: a Z16 grid plus the sensor's raw-to-meters scale.
#[derive(Debug, Clone)]
pub struct DepthFrame {
    width: u32,
    height: u32,
    raw: Vec<u16>,
    depth_scale: f64,
}

impl DepthFrame {
    /// Wrap a raw Z16 grid. `raw` must hold `width * height` samples. The
    /// scale is held as `f64` so meter conversion carries no single-precision
    /// widening error.
    pub fn new(width: u32, height: u32, raw: Vec<u16>, depth_scale: f64) -> Self {
        debug_assert_eq!(raw.len(), (width * height) as usize);
        Self {
            width,
            height,
            raw,
            depth_scale,
        }
    }

    /// Frame dimensions (width, height).
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Raw sensor sample at a pixel; 0 means no return. Out-of-bounds
    /// coordinates read as no return.
    pub fn raw_at(&self, x: i32, y: i32) -> u16 {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return 0;
        }
        self.raw[y as usize * self.width as usize + x as usize]
    }

    /// Distance in meters at a pixel after applying the depth scale.
    /// Zero when the sensor has no return there.
    pub fn distance_at(&self, x: i32, y: i32) -> f64 {
        self.raw_at(x, y) as f64 * self.depth_scale
    }
}

/// An aligned color+depth pair sharing one pixel grid.
#[derive(Debug, Clone)]
pub struct AlignedFrame {
    /// Color frame.
    pub color: RgbImage,
    /// Depth frame aligned to the color pixel grid.
    pub depth: DepthFrame,
}

impl AlignedFrame {
    /// Returns `true` when both frames are non-empty and share dimensions.
    pub fn is_consistent(&self) -> bool {
        let (w, h) = self.color.dimensions();
        w > 0 && h > 0 && self.depth.dimensions() == (w, h)
    }
}

/// Blocking frame acquisition with a bounded wait.
pub trait FrameSource {
    /// Wait for the next aligned frame pair, up to `timeout`.
    fn wait_frame(&mut self, timeout: Duration) -> Result<AlignedFrame, SensorError>;
}

// ── RealSense backend ──────────────────────────────────────────────────────

#[cfg(feature = "realsense")]
pub use realsense::RealSenseSource;

#[cfg(feature = "realsense")]
mod realsense {
    use std::time::Duration;

    use realsense_rust::{
        config::Config,
        context::Context,
        kind::{Rs2Format, Rs2StreamKind},
        pipeline::InactivePipeline,
    };

    use super::{AlignedFrame, DepthFrame, FrameSource, SensorError};

    /// Live frame source backed by librealsense2.
    ///
    /// Opens matched color (RGB8) and depth (Z16) streams at the requested
    /// geometry. Intrinsics are supplied by configuration, not queried from
    /// the device; the camera is assumed pre-calibrated.
    pub struct RealSenseSource {
        pipeline: realsense_rust::pipeline::ActivePipeline,
        width: u32,
        height: u32,
        depth_scale: f64,
    }

    impl RealSenseSource {
        /// Open a session. Fails with [`SensorError::NoDevice`] when no
        /// camera is connected.
        pub fn open(
            width: u32,
            height: u32,
            fps: u32,
            depth_scale: f64,
        ) -> Result<Self, SensorError> {
            let context =
                Context::new().map_err(|e| SensorError::Disconnected(format!("{e:?}")))?;
            let devices = context
                .query_devices(None)
                .map_err(|e| SensorError::Disconnected(format!("{e:?}")))?;
            if devices.is_empty() {
                return Err(SensorError::NoDevice);
            }

            let pipeline = InactivePipeline::try_from(&context)
                .map_err(|e| SensorError::Disconnected(format!("{e:?}")))?;

            let mut config = Config::new();
            config
                .enable_stream(
                    Rs2StreamKind::Depth,
                    None,
                    width as usize,
                    height as usize,
                    Rs2Format::Z16,
                    fps as usize,
                )
                .map_err(|e| SensorError::Disconnected(format!("{e:?}")))?;
            config
                .enable_stream(
                    Rs2StreamKind::Color,
                    None,
                    width as usize,
                    height as usize,
                    Rs2Format::Rgb8,
                    fps as usize,
                )
                .map_err(|e| SensorError::Disconnected(format!("{e:?}")))?;

            let pipeline = pipeline
                .start(Some(config))
                .map_err(|e| SensorError::Disconnected(format!("{e:?}")))?;

            tracing::info!("RealSense session open: {}x{} @ {} fps", width, height, fps);
            Ok(Self {
                pipeline,
                width,
                height,
                depth_scale,
            })
        }
    }

    impl FrameSource for RealSenseSource {
        fn wait_frame(&mut self, timeout: Duration) -> Result<AlignedFrame, SensorError> {
            let frames = self
                .pipeline
                .wait(Some(timeout))
                .map_err(|_| SensorError::Timeout)?;

            let color_frame = frames.color_frame().ok_or(SensorError::Timeout)?;
            let depth_frame = frames.depth_frame().ok_or(SensorError::Timeout)?;

            let color = image::RgbImage::from_raw(
                self.width,
                self.height,
                color_frame.get_data().to_vec(),
            )
            .ok_or_else(|| SensorError::Disconnected("short color frame".into()))?;

            let data = depth_frame.get_data();
            let mut raw = Vec::with_capacity(data.len() / 2);
            for chunk in data.chunks_exact(2) {
                raw.push(u16::from_le_bytes([chunk[0], chunk[1]]));
            }
            if raw.len() != (self.width * self.height) as usize {
                return Err(SensorError::Disconnected("short depth frame".into()));
            }

            Ok(AlignedFrame {
                color,
                depth: DepthFrame::new(self.width, self.height, raw, self.depth_scale),
            })
        }
    }
}
