//! Focus gate.
//!
//! Sharpness is the variance of the Laplacian response: defocus removes high
//! frequencies, so a blurry frame has a flat second derivative and a low
//! score. The retry loop is bounded; it never waits on the camera forever.

use crate::image::filter::laplacian;
use crate::image::{ImageView, OwnedImage};
use crate::trace::{trace_event, trace_span};
use crate::util::math::mean_variance;
use crate::util::HoleCheckResult;
use std::thread;
use std::time::Duration;

/// Variance of the Laplacian of `frame`.
pub fn sharpness_score(frame: ImageView<'_, u8>) -> f64 {
    let (_, variance) = mean_variance(laplacian(frame));
    variance
}

/// True when the sharpness score falls below `threshold`.
pub fn is_blurry(frame: ImageView<'_, u8>, threshold: f64) -> bool {
    sharpness_score(frame) < threshold
}

/// Focus gate parameters.
#[derive(Clone, Debug)]
pub struct FocusConfig {
    /// Scores below this are considered blurry.
    pub threshold: f64,
    /// Number of blurry frames tolerated before giving up.
    pub max_attempts: usize,
    /// Pause after each evaluation, letting the optics settle.
    pub retry_delay: Duration,
}

impl Default for FocusConfig {
    fn default() -> Self {
        Self {
            threshold: 100.0,
            max_attempts: 3,
            retry_delay: Duration::from_secs(2),
        }
    }
}

/// Camera-side actions the focus loop needs.
pub trait FocusRig {
    /// Grabs a preview frame to evaluate.
    fn preview(&mut self) -> HoleCheckResult<OwnedImage>;
    /// Issues one focus adjustment.
    fn adjust_focus(&mut self) -> HoleCheckResult<()>;
    /// Triggers the real capture.
    fn capture(&mut self) -> HoleCheckResult<()>;
}

/// Result of a focus-checked capture.
#[derive(Clone, Debug, PartialEq)]
pub enum FocusOutcome {
    /// A sharp frame was found and the capture was triggered.
    Captured { attempts: usize, score: f64 },
    /// Every evaluated frame was blurry.
    GaveUp { attempts: usize, last_score: f64 },
}

/// Bounded capture-with-refocus loop.
#[derive(Clone, Debug, Default)]
pub struct FocusGate {
    cfg: FocusConfig,
}

impl FocusGate {
    /// Creates a gate with the given configuration.
    pub fn new(cfg: FocusConfig) -> Self {
        Self { cfg }
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &FocusConfig {
        &self.cfg
    }

    /// Evaluates a single frame against the configured threshold.
    pub fn is_blurry(&self, frame: ImageView<'_, u8>) -> bool {
        is_blurry(frame, self.cfg.threshold)
    }

    /// Evaluates preview frames until one is sharp, adjusting focus after
    /// each blurry one, for at most `max_attempts` blurry frames.
    pub fn capture_with_focus_check<R: FocusRig>(
        &self,
        rig: &mut R,
    ) -> HoleCheckResult<FocusOutcome> {
        let _span = trace_span!("focus_gate", max_attempts = self.cfg.max_attempts).entered();
        let mut blurry = 0usize;
        let mut last_score = 0.0f64;
        while blurry < self.cfg.max_attempts {
            let frame = rig.preview()?;
            let score = sharpness_score(frame.view());
            last_score = score;
            trace_event!("sharpness", score = score, attempt = blurry + 1);

            if score < self.cfg.threshold {
                rig.adjust_focus()?;
                blurry += 1;
            } else {
                rig.capture()?;
                return Ok(FocusOutcome::Captured {
                    attempts: blurry + 1,
                    score,
                });
            }
            if !self.cfg.retry_delay.is_zero() {
                thread::sleep(self.cfg.retry_delay);
            }
        }
        Ok(FocusOutcome::GaveUp {
            attempts: blurry,
            last_score,
        })
    }
}
