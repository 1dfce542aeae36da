#![allow(dead_code)]

use holecheck::{ChannelOpener, HoleCheckError, HoleCheckResult, MotionChannel, MotionConfig};
use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex};

/// In-memory controller: scripted replies in, captured frames out.
#[derive(Clone, Default)]
pub struct MockPort {
    replies: Arc<Mutex<VecDeque<u8>>>,
    written: Arc<Mutex<Vec<u8>>>,
}

impl MockPort {
    pub fn with_replies(replies: &[u8]) -> Self {
        let port = Self::default();
        port.replies.lock().unwrap().extend(replies.iter().copied());
        port
    }

    pub fn written(&self) -> String {
        String::from_utf8(self.written.lock().unwrap().clone()).unwrap()
    }
}

impl Read for MockPort {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut replies = self.replies.lock().unwrap();
        let mut n = 0;
        while n < buf.len() {
            match replies.pop_front() {
                Some(b) => {
                    buf[n] = b;
                    n += 1;
                }
                None => break,
            }
        }
        if n == 0 {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "no data"));
        }
        Ok(n)
    }
}

impl Write for MockPort {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.written.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Opener handing out clones of one mock port; counts how often it opened.
#[derive(Clone)]
pub struct MockOpener {
    pub port: MockPort,
    pub cfg: MotionConfig,
    pub opened: Arc<Mutex<usize>>,
    pub fail: bool,
}

impl MockOpener {
    pub fn new(port: MockPort) -> Self {
        Self {
            port,
            cfg: MotionConfig {
                ack_timeout_ms: 50,
                settle_ms: 0,
                ..MotionConfig::default()
            },
            opened: Arc::new(Mutex::new(0)),
            fail: false,
        }
    }

    pub fn unreachable() -> Self {
        Self {
            fail: true,
            ..Self::new(MockPort::default())
        }
    }

    pub fn opened(&self) -> usize {
        *self.opened.lock().unwrap()
    }
}

impl ChannelOpener for MockOpener {
    type Port = MockPort;

    fn open(&self) -> HoleCheckResult<MotionChannel<MockPort>> {
        if self.fail {
            return Err(HoleCheckError::Device {
                reason: "open /dev/ttyACM0: no such device".into(),
            });
        }
        *self.opened.lock().unwrap() += 1;
        Ok(MotionChannel::new(self.port.clone(), self.cfg.clone()))
    }
}

/// Grayscale frame with a filled disk.
pub fn disk_frame(width: usize, height: usize, cx: f32, cy: f32, radius: f32) -> Vec<u8> {
    let mut data = vec![40u8; width * height];
    for y in 0..height {
        for x in 0..width {
            let dx = x as f32 - cx;
            let dy = y as f32 - cy;
            if dx * dx + dy * dy <= radius * radius {
                data[y * width + x] = 200;
            }
        }
    }
    data
}

/// Bright circular outline, 3 px wide, centered on `radius`.
pub fn ring_frame(width: usize, height: usize, cx: f32, cy: f32, radius: f32) -> Vec<u8> {
    let mut data = vec![40u8; width * height];
    for y in 0..height {
        for x in 0..width {
            let d = (x as f32 - cx).hypot(y as f32 - cy);
            if (d - radius).abs() <= 1.5 {
                data[y * width + x] = 200;
            }
        }
    }
    data
}
