//! Blocking command channel over any byte transport.

use super::{Ack, MotionCommand, MotionConfig};
use crate::hole::HoleCode;
use crate::trace::{trace_event, trace_span, trace_warn};
use crate::util::{HoleCheckError, HoleCheckResult};
use std::io::{ErrorKind, Read, Write};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// One command in flight at a time over a `Read + Write` transport.
pub struct MotionChannel<T> {
    port: T,
    cfg: MotionConfig,
}

impl<T: Read + Write> MotionChannel<T> {
    /// Wraps an already opened transport.
    pub fn new(port: T, cfg: MotionConfig) -> Self {
        Self { port, cfg }
    }

    /// Returns the link settings.
    pub fn config(&self) -> &MotionConfig {
        &self.cfg
    }

    /// Releases the transport.
    pub fn into_inner(self) -> T {
        self.port
    }

    /// Writes `cmd` and waits, bounded by `ack_timeout_ms`, for the reply it
    /// expects. Corrections expect none.
    pub fn send(&mut self, cmd: &MotionCommand) -> HoleCheckResult<Ack> {
        let _span = trace_span!("motion_send", kind = cmd.kind()).entered();
        self.write_frame(cmd)?;
        let deadline = Some(Instant::now() + self.cfg.ack_timeout());
        match cmd {
            MotionCommand::MoveBy(_) => Ok(Ack::Sent),
            MotionCommand::RetakeHole(_) => self.wait_ready(cmd, deadline),
            MotionCommand::ResetAll => match self.read_line(deadline)? {
                Some(line) => Ok(Ack::Status(line)),
                None => Err(self.timeout(cmd)),
            },
        }
    }

    /// Sends a retake request and blocks until the controller reports ready,
    /// without an upper bound.
    pub fn send_and_wait_ready(&mut self, code: &HoleCode) -> HoleCheckResult<Ack> {
        let cmd = MotionCommand::RetakeHole(code.clone());
        let _span = trace_span!("motion_send", kind = cmd.kind()).entered();
        self.write_frame(&cmd)?;
        self.wait_ready(&cmd, None)
    }

    fn write_frame(&mut self, cmd: &MotionCommand) -> HoleCheckResult<()> {
        let frame = cmd.encode();
        self.port
            .write_all(frame.as_bytes())
            .and_then(|_| self.port.flush())
            .map_err(|e| HoleCheckError::Device {
                reason: format!("write {}: {e}", frame.trim_end()),
            })?;
        trace_event!("command_sent", frame = frame.trim_end());
        Ok(())
    }

    /// Ready is a `1` as the first non-blank byte of a reply; it counts
    /// as soon as it arrives, newline or not. Other replies are skipped line
    /// by line.
    fn wait_ready(&mut self, cmd: &MotionCommand, deadline: Option<Instant>) -> HoleCheckResult<Ack> {
        let mut line = Vec::new();
        loop {
            let Some(byte) = self.read_byte(deadline)? else {
                return Err(self.timeout(cmd));
            };
            match byte {
                b'1' if line.is_empty() => return Ok(Ack::Ready),
                b'\n' => {
                    if !line.is_empty() {
                        let text = String::from_utf8_lossy(&line).trim().to_string();
                        trace_warn!("ignoring controller line {text:?} while waiting for ready");
                        line.clear();
                    }
                }
                b if line.is_empty() && b.is_ascii_whitespace() => {}
                b => line.push(b),
            }
        }
    }

    fn timeout(&self, cmd: &MotionCommand) -> HoleCheckError {
        HoleCheckError::DeviceTimeout {
            command: cmd.encode().trim_end().to_string(),
            waited_ms: self.cfg.ack_timeout_ms,
        }
    }

    /// Reads one trimmed line. Returns `None` when the deadline passes with
    /// nothing received; a partial line is returned as is.
    fn read_line(&mut self, deadline: Option<Instant>) -> HoleCheckResult<Option<String>> {
        let mut buf = Vec::new();
        loop {
            match self.read_byte(deadline)? {
                Some(b'\n') => {
                    return Ok(Some(String::from_utf8_lossy(&buf).trim().to_string()));
                }
                Some(b) => buf.push(b),
                None => {
                    let partial = String::from_utf8_lossy(&buf).trim().to_string();
                    return Ok((!partial.is_empty()).then_some(partial));
                }
            }
        }
    }

    /// Reads one byte, polling until it arrives. `None` once the deadline
    /// passes; without a deadline it waits indefinitely.
    fn read_byte(&mut self, deadline: Option<Instant>) -> HoleCheckResult<Option<u8>> {
        let mut byte = [0u8; 1];
        loop {
            match self.port.read(&mut byte) {
                Ok(1) => return Ok(Some(byte[0])),
                Ok(_) => {}
                Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {}
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(HoleCheckError::Device {
                        reason: format!("read: {e}"),
                    })
                }
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                return Ok(None);
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

/// Opens the channel on demand, so each user holds the device exclusively
/// for the duration of one operation.
pub trait ChannelOpener {
    type Port: Read + Write;

    fn open(&self) -> HoleCheckResult<MotionChannel<Self::Port>>;
}

/// Opens the configured serial device and waits for the controller to settle.
#[cfg(feature = "serial")]
#[derive(Clone, Debug, Default)]
pub struct SerialOpener {
    pub cfg: MotionConfig,
}

#[cfg(feature = "serial")]
impl SerialOpener {
    pub fn new(cfg: MotionConfig) -> Self {
        Self { cfg }
    }
}

#[cfg(feature = "serial")]
impl ChannelOpener for SerialOpener {
    type Port = Box<dyn serialport::SerialPort>;

    fn open(&self) -> HoleCheckResult<MotionChannel<Self::Port>> {
        let port = serialport::new(self.cfg.port.as_str(), self.cfg.baud_rate)
            .timeout(self.cfg.read_timeout())
            .open()
            .map_err(|e| HoleCheckError::Device {
                reason: format!("open {}: {e}", self.cfg.port),
            })?;
        // Opening the port resets the controller.
        thread::sleep(self.cfg.settle());
        Ok(MotionChannel::new(port, self.cfg.clone()))
    }
}
