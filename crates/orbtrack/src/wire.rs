//! Fixed-layout wire frame for the downstream embedded controller.
//!
//! Exactly one format is produced: a single marker byte identifying the
//! message type, followed by X, Y, Z as signed 16-bit little-endian integers
//! in millimeters. The frame is 7 bytes, with no length prefix, checksum or
//! delimiter; the receiver resynchronizes purely by byte count.
//!
//! Meters are scaled to millimeters and truncated toward zero (not rounded).
//! Values outside the i16 range are handled by an explicit [`RangePolicy`]
//! instead of wrapping silently.

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

/// Marker byte prefixed to every frame.
pub const MARKER: u8 = 0x11;

/// Total frame size in bytes: marker + 3 x i16.
pub const FRAME_LEN: usize = 7;

// ── Error type ─────────────────────────────────────────────────────────────

/// Errors produced by frame encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    /// A scaled coordinate does not fit a signed 16-bit millimeter field.
    OutOfRange {
        /// Axis label: 'x', 'y' or 'z'.
        axis: char,
        /// Truncated millimeter value that overflowed.
        mm: i64,
    },
}

impl std::fmt::Display for WireError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OutOfRange { axis, mm } => {
                write!(f, "{} coordinate {} mm exceeds the i16 field", axis, mm)
            }
        }
    }
}

impl std::error::Error for WireError {}

// ── Range policy ───────────────────────────────────────────────────────────

/// What to do when a coordinate exceeds ±32.767 m.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RangePolicy {
    /// Clamp to the nearest representable millimeter value.
    #[default]
    Saturate,
    /// Refuse to encode; the cycle is skipped and logged.
    Reject,
}

// ── Encode / decode ────────────────────────────────────────────────────────

#[inline]
fn to_mm(v: f64) -> i64 {
    // `as` saturates for non-finite and out-of-range floats.
    (v * 1000.0).trunc() as i64
}

fn field(axis: char, mm: i64, policy: RangePolicy) -> Result<i16, WireError> {
    if let Ok(v) = i16::try_from(mm) {
        return Ok(v);
    }
    match policy {
        RangePolicy::Saturate => Ok(if mm < 0 { i16::MIN } else { i16::MAX }),
        RangePolicy::Reject => Err(WireError::OutOfRange { axis, mm }),
    }
}

/// Encode a camera-space point (meters) into one wire frame.
///
/// Deterministic: the same point and policy always produce the same bytes.
pub fn encode(point: &Point3<f64>, policy: RangePolicy) -> Result<[u8; FRAME_LEN], WireError> {
    let x = field('x', to_mm(point.x), policy)?;
    let y = field('y', to_mm(point.y), policy)?;
    let z = field('z', to_mm(point.z), policy)?;

    let mut frame = [0u8; FRAME_LEN];
    frame[0] = MARKER;
    frame[1..3].copy_from_slice(&x.to_le_bytes());
    frame[3..5].copy_from_slice(&y.to_le_bytes());
    frame[5..7].copy_from_slice(&z.to_le_bytes());
    Ok(frame)
}

/// Receiver-side inverse unpacking: millimeter triple from one frame.
///
/// Returns `None` for a wrong length or marker byte. This mirrors what the
/// embedded controller does and is exercised by the round-trip tests.
pub fn decode(frame: &[u8]) -> Option<(i16, i16, i16)> {
    if frame.len() != FRAME_LEN || frame[0] != MARKER {
        return None;
    }
    let x = i16::from_le_bytes([frame[1], frame[2]]);
    let y = i16::from_le_bytes([frame[3], frame[4]]);
    let z = i16::from_le_bytes([frame[5], frame[6]]);
    Some((x, y, z))
}
