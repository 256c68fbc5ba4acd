//! Frame loop controller.
//!
//! Drives the per-frame cycle
//! `WAIT_FRAME → CHECK_VALID → DETECT → LOCALIZE → ENCODE_SEND` with early
//! exits back to `WAIT_FRAME` when a stage has nothing to forward. The loop
//! is blocking and synchronous: one logical thread owns the whole cycle, and
//! every per-frame entity (mask, candidates, point, wire frame) is allocated
//! fresh and dropped within its iteration.
//!
//! Per-frame failures never terminate the loop; shutdown happens only via
//! the cooperative stop flag, checked once per iteration. Each iteration's
//! result is reported as a [`CycleOutcome`] so every early-exit branch is
//! observable and testable.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use nalgebra::Point3;

use crate::camera::CameraIntrinsics;
use crate::config::{ConfigError, TrackConfig};
use crate::detect::{select, BlobDetector};
use crate::filter::ExpSmoother;
use crate::segment::hsv_mask;
use crate::sensor::FrameSource;
use crate::transport::Transport;
use crate::wire;

/// What one cycle of the loop did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CycleOutcome {
    /// A point was localized, encoded and written to the transport.
    Sent(Point3<f64>),
    /// No valid aligned frame arrived (timeout, disconnect, or an
    /// inconsistent color/depth pair).
    NoFrame,
    /// Segmentation/detection found zero candidates. Silent by design.
    NoCandidate,
    /// The depth sample at the selected pixel had no return.
    NoDepth,
    /// The encoder rejected an out-of-range coordinate.
    OutOfRange,
    /// The transport write failed; logged and skipped.
    SendFailed,
}

/// Counters accumulated over one `run`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    /// Total iterations executed.
    pub cycles: u64,
    /// Frames successfully transmitted.
    pub sent: u64,
    /// Cycles skipped for missing/invalid frames.
    pub no_frame: u64,
    /// Cycles with zero detections.
    pub no_candidate: u64,
    /// Cycles with a degenerate depth sample.
    pub no_depth: u64,
    /// Cycles rejected by the encoder range policy.
    pub out_of_range: u64,
    /// Cycles lost to transport write errors.
    pub send_failed: u64,
}

impl LoopStats {
    fn record(&mut self, outcome: &CycleOutcome) {
        self.cycles += 1;
        match outcome {
            CycleOutcome::Sent(_) => self.sent += 1,
            CycleOutcome::NoFrame => self.no_frame += 1,
            CycleOutcome::NoCandidate => self.no_candidate += 1,
            CycleOutcome::NoDepth => self.no_depth += 1,
            CycleOutcome::OutOfRange => self.out_of_range += 1,
            CycleOutcome::SendFailed => self.send_failed += 1,
        }
    }
}

/// The synchronous perception-to-actuation loop.
///
/// Owns the frame source and the transport for its lifetime (both released
/// on drop), plus the per-stage configuration and intrinsics.
pub struct TrackLoop<S: FrameSource, T: Transport> {
    source: S,
    transport: T,
    intrinsics: CameraIntrinsics,
    config: TrackConfig,
    detector: Box<dyn BlobDetector + Send>,
    smoother: Option<ExpSmoother>,
    timeout: Duration,
    stop: Arc<AtomicBool>,
}

impl<S: FrameSource, T: Transport> TrackLoop<S, T> {
    /// Build a loop from validated configuration and intrinsics.
    ///
    /// Fails fast on malformed configuration or invalid focal lengths, before
    /// any frame is requested.
    pub fn new(
        source: S,
        transport: T,
        intrinsics: CameraIntrinsics,
        config: TrackConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let detector = config.detector.build();
        let smoother = config.smoothing.map(ExpSmoother::new);
        let timeout = Duration::from_millis(config.frame_timeout_ms);
        Ok(Self {
            source,
            transport,
            intrinsics,
            config,
            detector,
            smoother,
            timeout,
            stop: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Handle that makes `run` return after the current iteration.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Run until the stop flag is raised; returns the accumulated counters.
    pub fn run(&mut self) -> LoopStats {
        let mut stats = LoopStats::default();
        tracing::info!("frame loop started");
        while !self.stop.load(Ordering::Relaxed) {
            let outcome = self.step();
            stats.record(&outcome);
        }
        tracing::info!(
            "frame loop stopped: {} cycles, {} sent, {} no-frame, {} no-candidate, {} no-depth",
            stats.cycles,
            stats.sent,
            stats.no_frame,
            stats.no_candidate,
            stats.no_depth,
        );
        stats
    }

    /// Execute one WAIT_FRAME → ENCODE_SEND cycle.
    pub fn step(&mut self) -> CycleOutcome {
        let outcome = self.cycle();
        // A cycle with no localization is a detection gap; stale smoother
        // state would drag the next reading toward an old position.
        if matches!(
            outcome,
            CycleOutcome::NoFrame | CycleOutcome::NoCandidate | CycleOutcome::NoDepth
        ) {
            if let Some(smoother) = self.smoother.as_mut() {
                smoother.reset();
            }
        }
        outcome
    }

    fn cycle(&mut self) -> CycleOutcome {
        // WAIT_FRAME
        let frame = match self.source.wait_frame(self.timeout) {
            Ok(frame) => frame,
            Err(err) => {
                tracing::debug!("no frame this cycle: {}", err);
                return CycleOutcome::NoFrame;
            }
        };

        // CHECK_VALID
        if !frame.is_consistent() {
            tracing::warn!("dropping inconsistent color/depth pair");
            return CycleOutcome::NoFrame;
        }

        // DETECT
        let Ok(mask) = hsv_mask(&frame.color, &self.config.band) else {
            return CycleOutcome::NoFrame;
        };
        let gray = image::imageops::grayscale(&frame.color);
        let candidates = self.detector.detect(&mask, &gray);
        let Some(candidate) = select(&candidates, self.config.selection) else {
            return CycleOutcome::NoCandidate;
        };

        // LOCALIZE
        let depth_m = frame.depth.distance_at(candidate.x, candidate.y);
        let Some(point) = self
            .intrinsics
            .deproject([candidate.x as f64, candidate.y as f64], depth_m)
        else {
            tracing::debug!(
                "no depth return at ({}, {}); skipping cycle",
                candidate.x,
                candidate.y
            );
            return CycleOutcome::NoDepth;
        };

        let point = match self.smoother.as_mut() {
            Some(smoother) => smoother.apply(point),
            None => point,
        };

        // ENCODE_SEND
        let frame_bytes = match wire::encode(&point, self.config.range_policy) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!("encoder rejected point: {}", err);
                return CycleOutcome::OutOfRange;
            }
        };
        if let Err(err) = self.transport.send(&frame_bytes) {
            tracing::warn!("transport write failed: {}", err);
            return CycleOutcome::SendFailed;
        }
        CycleOutcome::Sent(point)
    }

    /// Release the transport and frame source, consuming the loop.
    pub fn into_parts(self) -> (S, T) {
        (self.source, self.transport)
    }
}
