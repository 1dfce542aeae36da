//! Foreground contours and the coverage estimate built on them.
//!
//! Images are binarized with Otsu's level and the borders of the foreground
//! components are traced by `imageproc`. Contour area is the shoelace area
//! of the traced pixel-center polygon; only outer borders count.

use crate::image::filter::{binarize_above, otsu_level};
use crate::image::ImageView;
use crate::util::{HoleCheckError, HoleCheckResult};
use image::GrayImage;
use imageproc::contours::{find_contours, BorderType};
use imageproc::point::Point;

fn shoelace(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut acc = 0i64;
    for (i, p) in points.iter().enumerate() {
        let q = points[(i + 1) % points.len()];
        acc += p.x as i64 * q.y as i64 - q.x as i64 * p.y as i64;
    }
    (acc as f64).abs() / 2.0
}

/// Areas of the outer contours of every foreground component of a binary
/// image (non-zero pixels are foreground).
pub(crate) fn contour_areas(mask: &GrayImage) -> Vec<f64> {
    find_contours::<i32>(mask)
        .into_iter()
        .filter(|c| matches!(c.border_type, BorderType::Outer))
        .map(|c| shoelace(&c.points))
        .collect()
}

/// Area of the largest external contour after Otsu binarization, or `None`
/// when the image has no foreground.
pub fn largest_contour_area(img: ImageView<'_, u8>) -> Option<f64> {
    let level = otsu_level(img);
    contour_areas(&binarize_above(img, level))
        .into_iter()
        .max_by(|a, b| a.total_cmp(b))
}

/// Obstruction percentage `(source - frame) / source * 100` between the
/// largest contour areas of the two images.
pub fn coverage_estimate(source: ImageView<'_, u8>, frame: ImageView<'_, u8>) -> HoleCheckResult<f32> {
    let source_area = match largest_contour_area(source) {
        Some(a) if a > 0.0 => a,
        _ => return Err(HoleCheckError::NoContour { which: "source" }),
    };
    let frame_area =
        largest_contour_area(frame).ok_or(HoleCheckError::NoContour { which: "frame" })?;
    Ok(((source_area - frame_area) / source_area * 100.0) as f32)
}
