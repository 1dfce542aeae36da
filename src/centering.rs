//! Centering feedback loop: latest frame, hole center, horizontal error,
//! correction command.

use crate::circle::{detect_center, pixel_offset, Calibration, CircleCenter, CircleConfig};
use crate::image::io::load_gray_image;
use crate::image::ImageView;
use crate::inspect::{latest_image, CENTERING_EXTENSIONS};
use crate::motion::{ChannelOpener, MotionCommand};
use crate::trace::{trace_event, trace_span};
use crate::util::HoleCheckResult;
use std::path::{Path, PathBuf};

/// Correction derived from one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Correction {
    pub center: CircleCenter,
    /// Horizontal error in pixels, positive to the right of the middle.
    pub offset_px: i32,
    /// Error in controller units (hundredths).
    pub units: i32,
    pub command: MotionCommand,
}

/// Result of one centering cycle.
#[derive(Clone, Debug, PartialEq)]
pub enum CenteringOutcome {
    /// The folder holds no images yet.
    NoImages,
    /// No circle in the latest frame; nothing was sent.
    NoCircle { path: PathBuf },
    /// The correction was sent to the controller.
    Sent { path: PathBuf, correction: Correction },
}

/// Detector and calibration for the centering loop.
#[derive(Clone, Debug, Default)]
pub struct CenteringLoop {
    pub circle: CircleConfig,
    pub calibration: Calibration,
}

impl CenteringLoop {
    pub fn new(circle: CircleConfig, calibration: Calibration) -> Self {
        Self {
            circle,
            calibration,
        }
    }

    /// Computes the correction for `frame`, or `None` without a circle.
    pub fn compute_correction(&self, frame: ImageView<'_, u8>) -> Option<Correction> {
        let center = detect_center(frame, &self.circle)?;
        let offset_px = pixel_offset(center.x, frame.width());
        let units = self.calibration.to_units(offset_px);
        Some(Correction {
            center,
            offset_px,
            units,
            command: MotionCommand::MoveBy(units),
        })
    }

    /// Runs one cycle on the newest image in `dir`. The channel is opened
    /// only when there is a correction to send.
    pub fn correct_latest<O: ChannelOpener>(
        &self,
        dir: &Path,
        opener: &O,
    ) -> HoleCheckResult<CenteringOutcome> {
        let _span = trace_span!("centering").entered();
        let Some(path) = latest_image(dir, CENTERING_EXTENSIONS)? else {
            return Ok(CenteringOutcome::NoImages);
        };
        let frame = load_gray_image(&path)?;
        let Some(correction) = self.compute_correction(frame.view()) else {
            return Ok(CenteringOutcome::NoCircle { path });
        };
        trace_event!(
            "correction",
            offset_px = correction.offset_px,
            units = correction.units
        );
        let mut channel = opener.open()?;
        channel.send(&correction.command)?;
        Ok(CenteringOutcome::Sent { path, correction })
    }
}
