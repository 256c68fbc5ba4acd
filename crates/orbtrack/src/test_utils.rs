//! Shared test utilities: synthetic frames and scripted collaborators.
//!
//! Consolidated here so the detector and runner tests all draw the same
//! synthetic disks instead of carrying private copies.

use std::collections::VecDeque;
use std::time::Duration;

use image::{GrayImage, Luma, Rgb, RgbImage};

use crate::sensor::{AlignedFrame, DepthFrame, FrameSource, SensorError};
use crate::transport::Transport;

/// Orange ball color used by synthetic frames; maps to HSV [10, 255, 255],
/// inside the default band.
pub(crate) const BALL_RGB: Rgb<u8> = Rgb([255, 85, 0]);
/// Neutral background; zero saturation, outside any colored band.
pub(crate) const BG_RGB: Rgb<u8> = Rgb([40, 40, 40]);

/// Render a filled disk into a fresh binary mask.
pub(crate) fn draw_disk_mask(w: u32, h: u32, center: [f32; 2], radius: f32) -> GrayImage {
    let mut img = GrayImage::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let dx = x as f32 - center[0];
            let dy = y as f32 - center[1];
            if (dx * dx + dy * dy).sqrt() <= radius {
                img.put_pixel(x, y, Luma([255]));
            }
        }
    }
    img
}

/// Render a filled disk as an intensity image over a flat background.
pub(crate) fn draw_disk_gray(
    w: u32,
    h: u32,
    center: [f32; 2],
    radius: f32,
    disk_pix: u8,
    bg_pix: u8,
) -> GrayImage {
    let mut img = GrayImage::from_pixel(w, h, Luma([bg_pix]));
    for y in 0..h {
        for x in 0..w {
            let dx = x as f32 - center[0];
            let dy = y as f32 - center[1];
            if (dx * dx + dy * dy).sqrt() <= radius {
                img.put_pixel(x, y, Luma([disk_pix]));
            }
        }
    }
    img
}

/// Render an orange disk on a neutral background.
pub(crate) fn draw_ball_color(w: u32, h: u32, center: [f32; 2], radius: f32) -> RgbImage {
    let mut img = RgbImage::from_pixel(w, h, BG_RGB);
    for y in 0..h {
        for x in 0..w {
            let dx = x as f32 - center[0];
            let dy = y as f32 - center[1];
            if (dx * dx + dy * dy).sqrt() <= radius {
                img.put_pixel(x, y, BALL_RGB);
            }
        }
    }
    img
}

/// One synthetic aligned frame: orange disk + flat Z16 depth (scale 1 mm).
pub(crate) fn synthetic_ball_frame(
    w: u32,
    h: u32,
    center: [f32; 2],
    radius: f32,
    raw_depth: u16,
) -> AlignedFrame {
    AlignedFrame {
        color: draw_ball_color(w, h, center, radius),
        depth: DepthFrame::new(w, h, vec![raw_depth; (w * h) as usize], 0.001),
    }
}

/// Frame source that replays a script, then times out forever.
pub(crate) struct ScriptedSource {
    frames: VecDeque<Result<AlignedFrame, SensorError>>,
}

impl ScriptedSource {
    pub(crate) fn new(frames: Vec<Result<AlignedFrame, SensorError>>) -> Self {
        Self {
            frames: frames.into(),
        }
    }
}

impl FrameSource for ScriptedSource {
    fn wait_frame(&mut self, _timeout: Duration) -> Result<AlignedFrame, SensorError> {
        self.frames.pop_front().unwrap_or(Err(SensorError::Timeout))
    }
}

/// Transport whose every write fails, for loop resilience tests.
pub(crate) struct FailingTransport;

impl Transport for FailingTransport {
    fn send(&mut self, _frame: &[u8]) -> std::io::Result<()> {
        Err(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "receiver gone",
        ))
    }
}
