//! Progress model shown to operators, derived from the persisted counters.

use super::cells::{CounterCell, PauseFlag};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Which counter currently drives the display.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    Capture,
    Processing,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Capture => "capture",
            Self::Processing => "processing",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of run progress.
#[derive(Clone, Debug, PartialEq)]
pub struct ProgressView {
    pub phase: Phase,
    /// Counter value of the displayed phase.
    pub count: u32,
    pub total: u32,
    /// `count / total * 100`, capped at 100.
    pub percent: f64,
    pub label: String,
    /// Processing has reached the total.
    pub complete: bool,
}

impl ProgressView {
    /// Capture progress is shown until every hole is captured, then
    /// processing progress.
    pub fn compute(captured: u32, processed: u32, total: u32) -> Self {
        let pct = |n: u32| {
            if total == 0 {
                100.0
            } else {
                (n as f64 / total as f64 * 100.0).min(100.0)
            }
        };
        if captured < total {
            let percent = pct(captured);
            return Self {
                phase: Phase::Capture,
                count: captured,
                total,
                percent,
                label: format!("Image Taking: {}%", percent as u32),
                complete: false,
            };
        }
        let percent = pct(processed);
        let complete = processed >= total;
        let label = if complete {
            "Image Processing Complete!".to_string()
        } else {
            format!("Image Processing: {}%", percent as u32)
        };
        Self {
            phase: Phase::Processing,
            count: processed,
            total,
            percent,
            label,
            complete,
        }
    }

    /// Reads both counters and computes the view; unreadable counters count as 0.
    pub fn read(capture: &CounterCell, processing: &CounterCell, total: u32) -> Self {
        Self::compute(
            capture.try_read().unwrap_or(0),
            processing.try_read().unwrap_or(0),
            total,
        )
    }
}

/// Background thread refreshing a [`ProgressView`] on a fixed interval.
///
/// Refreshes are skipped while the pause flag is set. Dropping the poller
/// stops and joins the thread.
pub struct ProgressPoller {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ProgressPoller {
    pub fn spawn<F>(
        capture: CounterCell,
        processing: CounterCell,
        pause: PauseFlag,
        total: u32,
        interval: Duration,
        mut on_update: F,
    ) -> Self
    where
        F: FnMut(&ProgressView) + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let handle = thread::spawn(move || {
            while !flag.load(Ordering::Acquire) {
                if !pause.is_paused() {
                    on_update(&ProgressView::read(&capture, &processing, total));
                }
                let wake = Instant::now() + interval;
                while !flag.load(Ordering::Acquire) {
                    let now = Instant::now();
                    if now >= wake {
                        break;
                    }
                    thread::sleep((wake - now).min(Duration::from_millis(50)));
                }
            }
        });
        Self {
            stop,
            handle: Some(handle),
        }
    }

    /// Stops the thread and waits for it.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ProgressPoller {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::{Phase, ProgressView};

    #[test]
    fn capture_phase_until_all_captured() {
        let view = ProgressView::compute(793, 0, 1587);
        assert_eq!(view.phase, Phase::Capture);
        assert_eq!(view.label, "Image Taking: 49%");
        assert!(!view.complete);
    }

    #[test]
    fn processing_phase_and_completion() {
        let view = ProgressView::compute(1587, 0, 1587);
        assert_eq!(view.phase, Phase::Processing);
        assert_eq!(view.label, "Image Processing: 0%");

        let done = ProgressView::compute(1587, 1587, 1587);
        assert!(done.complete);
        assert_eq!(done.percent, 100.0);
        assert_eq!(done.label, "Image Processing Complete!");
    }
}
