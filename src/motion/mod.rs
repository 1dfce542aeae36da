//! Motion controller protocol.
//!
//! Commands are fixed-width ASCII frames terminated by a newline:
//!
//! - `TP007` / `TN123`: move by a signed offset in hundredths, magnitude
//!   zero-padded to three digits.
//! - `A0170`: position the stage for a retake of that hole; the controller
//!   answers with a `1` line once ready.
//! - `RR000`: reset; the controller answers with a status line.

mod channel;

pub use channel::{ChannelOpener, MotionChannel};
#[cfg(feature = "serial")]
pub use channel::SerialOpener;

use crate::hole::HoleCode;
use crate::trace::trace_warn;
use std::time::Duration;

/// Largest magnitude a correction frame can carry.
pub const MAX_MAGNITUDE: u32 = 999;

/// Command sent to the controller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MotionCommand {
    /// Move by a signed offset in controller units.
    MoveBy(i32),
    /// Position for a retake of one hole.
    RetakeHole(HoleCode),
    /// Return every axis to its home position.
    ResetAll,
}

impl MotionCommand {
    /// Builds the newline-terminated wire frame.
    ///
    /// Magnitudes above [`MAX_MAGNITUDE`] are clamped.
    pub fn encode(&self) -> String {
        match self {
            Self::MoveBy(offset) => {
                let sign = if *offset < 0 { 'N' } else { 'P' };
                let mut magnitude = offset.unsigned_abs();
                if magnitude > MAX_MAGNITUDE {
                    trace_warn!("correction {offset} exceeds frame width, clamped to {MAX_MAGNITUDE}");
                    magnitude = MAX_MAGNITUDE;
                }
                format!("T{sign}{magnitude:03}\n")
            }
            Self::RetakeHole(code) => format!("{code}\n"),
            Self::ResetAll => "RR000\n".to_string(),
        }
    }

    /// Command name for logs and errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MoveBy(_) => "move",
            Self::RetakeHole(_) => "retake",
            Self::ResetAll => "reset",
        }
    }
}

/// Controller acknowledgement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Ack {
    /// Frame written; the command expects no reply.
    Sent,
    /// Controller reported it is positioned for a retake.
    Ready,
    /// Status line returned after a reset.
    Status(String),
}

/// Serial link settings.
#[derive(Clone, Debug, PartialEq)]
pub struct MotionConfig {
    /// Device path.
    pub port: String,
    pub baud_rate: u32,
    /// Per-read timeout of the port.
    pub read_timeout_ms: u64,
    /// Bounded wait for a reply.
    pub ack_timeout_ms: u64,
    /// Delay after opening while the controller restarts.
    pub settle_ms: u64,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyACM0".to_string(),
            baud_rate: 9600,
            read_timeout_ms: 1000,
            ack_timeout_ms: 5000,
            settle_ms: 2000,
        }
    }
}

impl MotionConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::MotionCommand;
    use crate::hole::HoleCode;

    #[test]
    fn correction_frames_are_zero_padded() {
        assert_eq!(MotionCommand::MoveBy(7).encode(), "TP007\n");
        assert_eq!(MotionCommand::MoveBy(-123).encode(), "TN123\n");
        assert_eq!(MotionCommand::MoveBy(0).encode(), "TP000\n");
        assert_eq!(MotionCommand::MoveBy(-5000).encode(), "TN999\n");
    }

    #[test]
    fn retake_and_reset_frames() {
        let code = HoleCode::parse("a0170").unwrap();
        assert_eq!(MotionCommand::RetakeHole(code).encode(), "A0170\n");
        assert_eq!(MotionCommand::ResetAll.encode(), "RR000\n");
    }
}
