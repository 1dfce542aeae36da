//! Hole-center detection and conversion of the centering error into
//! controller units.
//!
//! The frame is edge-detected with Canny, the edge map is inverted so edges
//! are dark lines on a bright background, and the circular Hough transform
//! votes from those edge pixels along the frame gradient. The first circle
//! reported is the hole.

pub mod hough;

pub use hough::{hough_circles, Circle, HoughParams};

use crate::image::filter::invert;
use crate::image::io::{gray_from_view, owned_from_gray};
use crate::image::{ImageView, OwnedImage};
use imageproc::edges::canny;
use crate::trace::{trace_event, trace_span};

/// Center detector parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CircleConfig {
    pub min_radius: u32,
    pub max_radius: u32,
    /// Lower threshold of the frame edge pass.
    pub canny_low: f32,
    /// Upper threshold of the frame edge pass.
    pub canny_high: f32,
    /// Inverse accumulator resolution.
    pub dp: f32,
    /// Minimum distance between circle centers.
    pub min_distance: f32,
    /// Inverted edge-map pixels darker than this vote in the Hough transform.
    pub param1: f32,
    /// Accumulator vote threshold.
    pub param2: u32,
}

impl Default for CircleConfig {
    fn default() -> Self {
        Self {
            min_radius: 50,
            max_radius: 200,
            canny_low: 50.0,
            canny_high: 150.0,
            dp: 1.2,
            min_distance: 50.0,
            param1: 50.0,
            param2: 30,
        }
    }
}

impl CircleConfig {
    fn hough(&self) -> HoughParams {
        HoughParams {
            dp: self.dp,
            min_distance: self.min_distance,
            param1: self.param1,
            param2: self.param2,
            min_radius: self.min_radius,
            max_radius: self.max_radius,
        }
    }
}

/// Detected hole center.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CircleCenter {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
}

/// Canny edge map of `frame`: `255` on edges, `0` elsewhere.
pub fn edge_map(frame: ImageView<'_, u8>, low: f32, high: f32) -> OwnedImage {
    owned_from_gray(canny(&gray_from_view(frame), low, high))
}

/// Finds the hole center in `frame`, or `None` when no circle is found.
pub fn detect_center(frame: ImageView<'_, u8>, cfg: &CircleConfig) -> Option<CircleCenter> {
    let _span = trace_span!("detect_center").entered();
    let edges = edge_map(frame, cfg.canny_low, cfg.canny_high);
    let inverted = invert(edges.view());
    let circles = hough_circles(frame, inverted.view(), &cfg.hough());
    let first = circles.first()?;
    trace_event!(
        "circle_found",
        x = first.x,
        y = first.y,
        radius = first.radius,
        candidates = circles.len()
    );
    Some(CircleCenter {
        x: first.x,
        y: first.y,
        radius: first.radius,
    })
}

/// Horizontal offset of a center from the middle column, in whole pixels.
/// The center rounds half to even.
pub fn pixel_offset(center_x: f32, frame_width: usize) -> i32 {
    center_x.round_ties_even() as i32 - (frame_width / 2) as i32
}

/// Pixel-to-controller conversion.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Calibration {
    /// Pixels per physical unit.
    pub pixels_per_unit: f64,
    /// Transmission scale (hundredths).
    pub scale: f64,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            pixels_per_unit: 248.1111,
            scale: 100.0,
        }
    }
}

impl Calibration {
    /// Converts a pixel offset to rounded controller units; halves round to even.
    pub fn to_units(&self, offset_px: i32) -> i32 {
        (offset_px as f64 / self.pixels_per_unit * self.scale).round_ties_even() as i32
    }
}
