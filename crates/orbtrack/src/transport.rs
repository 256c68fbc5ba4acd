//! Byte-sink transport toward the embedded controller.
//!
//! The transport is an explicitly owned resource handed to the frame loop at
//! construction (no global handle); it is opened once at startup and released
//! when the loop is dropped. Write failures are non-fatal to the loop.

use std::io;

/// A write-only byte sink with open/write semantics.
pub trait Transport {
    /// Write one complete wire frame. Sequential, no acknowledgment.
    fn send(&mut self, frame: &[u8]) -> io::Result<()>;
}

/// In-memory transport that records every frame. Test double and dry-run
/// sink for the CLI.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    /// Frames in send order.
    pub frames: Vec<Vec<u8>>,
}

impl Transport for RecordingTransport {
    fn send(&mut self, frame: &[u8]) -> io::Result<()> {
        self.frames.push(frame.to_vec());
        Ok(())
    }
}

// ── Serial backend ─────────────────────────────────────────────────────────

#[cfg(feature = "serial")]
pub use serial::SerialTransport;

#[cfg(feature = "serial")]
mod serial {
    use std::io::{self, Write};
    use std::time::Duration;

    use super::Transport;

    /// Hardware serial port transport (8N1).
    pub struct SerialTransport {
        port: Box<dyn serialport::SerialPort>,
    }

    impl SerialTransport {
        /// Open `path` at `baud`. Fails fast at startup if the port cannot
        /// be opened.
        pub fn open(path: &str, baud: u32) -> io::Result<Self> {
            let port = serialport::new(path, baud)
                .data_bits(serialport::DataBits::Eight)
                .stop_bits(serialport::StopBits::One)
                .parity(serialport::Parity::None)
                .timeout(Duration::from_millis(100))
                .open()?;
            tracing::info!("serial transport open: {} @ {} baud", path, baud);
            Ok(Self { port })
        }
    }

    impl Transport for SerialTransport {
        fn send(&mut self, frame: &[u8]) -> io::Result<()> {
            self.port.write_all(frame)?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_transport_keeps_frames_in_order() {
        let mut t = RecordingTransport::default();
        t.send(&[1, 2, 3]).unwrap();
        t.send(&[4]).unwrap();
        assert_eq!(t.frames, vec![vec![1, 2, 3], vec![4]]);
    }
}
