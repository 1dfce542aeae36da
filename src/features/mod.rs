//! Sparse keypoints and binary descriptors.
//!
//! Keypoints are FAST corners detected on every level of a small image
//! pyramid, oriented by their intensity centroid, and described by steered
//! BRIEF on a Gaussian-smoothed copy of the level. Coordinates are reported
//! in the base image frame.

pub mod brief;
pub mod contour;
pub(crate) mod fast;
pub mod homography;
pub mod lsh;

pub use brief::{Descriptor, DESCRIPTOR_BYTES};
pub use contour::{coverage_estimate, largest_contour_area};
pub use homography::{fit_ransac, HomographyFit, RansacConfig};
pub use lsh::{ratio_test, LshIndex, LshParams, Neighbor};

use crate::image::filter::gaussian_blur;
use crate::image::pyramid::ImagePyramid;
use crate::image::ImageView;
use crate::trace::trace_event;
use crate::util::HoleCheckResult;

/// Keypoint detection parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectorConfig {
    /// Maximum number of keypoints kept, strongest first.
    pub max_keypoints: usize,
    /// FAST intensity threshold.
    pub fast_threshold: u8,
    /// Number of pyramid levels.
    pub levels: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            max_keypoints: 500,
            fast_threshold: 20,
            levels: 4,
        }
    }
}

/// Oriented keypoint in base-image coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    /// Pyramid level the keypoint was found on.
    pub level: usize,
    /// Orientation in radians.
    pub angle: f32,
    pub response: f32,
}

/// Keypoints paired index-for-index with their descriptors.
#[derive(Clone, Debug, Default)]
pub struct Features {
    pub keypoints: Vec<Keypoint>,
    pub descriptors: Vec<Descriptor>,
}

impl Features {
    /// Number of described keypoints.
    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    /// Returns true when nothing was detected.
    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }
}

const MIN_LEVEL_SIDE: usize = 32;
const BORDER: usize = fast::PATCH_RADIUS as usize + 1;
/// Smoothing applied before descriptor sampling.
const DESCRIBE_SIGMA: f32 = 2.0;

/// Detects and describes keypoints on `image`.
pub fn extract(image: ImageView<'_, u8>, cfg: &DetectorConfig) -> HoleCheckResult<Features> {
    let pyramid = ImagePyramid::build_u8(image, cfg.levels, MIN_LEVEL_SIDE)?;

    let mut found: Vec<(Keypoint, Descriptor)> = Vec::new();
    for (level, owned) in pyramid.levels().iter().enumerate() {
        let view = owned.view();
        let smoothed = gaussian_blur(view, DESCRIBE_SIGMA);
        let scale = ImagePyramid::scale_of(level);
        for corner in fast::detect(view, cfg.fast_threshold, BORDER) {
            let angle = fast::orientation(view, corner.x, corner.y);
            let desc = brief::describe(smoothed.view(), corner.x, corner.y, angle);
            found.push((
                Keypoint {
                    x: corner.x as f32 * scale,
                    y: corner.y as f32 * scale,
                    level,
                    angle,
                    response: corner.response,
                },
                desc,
            ));
        }
    }

    // Stable sort keeps detection order among equal responses.
    found.sort_by(|a, b| b.0.response.total_cmp(&a.0.response));
    found.truncate(cfg.max_keypoints);
    trace_event!("features_extracted", count = found.len());

    let (keypoints, descriptors) = found.into_iter().unzip();
    Ok(Features {
        keypoints,
        descriptors,
    })
}
