//! Inspection matchers.
//!
//! A matcher scores one captured frame against the baseline and decides
//! whether the hole looks clean. Two strategies exist and are selected by
//! configuration through [`InspectionMatcher`]:
//!
//! - [`RegionMatcher`]: multi-scale normalized correlation of the cropped
//!   baseline template. Higher scores are better.
//! - [`FeatureMatcher`]: sparse keypoint matching against the full baseline
//!   image, decided either by match count or by a RANSAC homography.

mod feature;
mod region;

pub use feature::{FeatureDecision, FeatureMatchConfig, FeatureMatcher, FeatureOutcome};
pub use region::{RegionMatch, RegionMatchConfig, RegionMatcher, NO_SCALE_SCORE};

use crate::hole::HoleId;
use crate::ImageView;
use std::fmt;

/// Where and at which scale the template matched best.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatchLocation {
    /// Column of the template's top-left corner in the frame.
    pub x: usize,
    /// Row of the template's top-left corner in the frame.
    pub y: usize,
    /// Template scale factor.
    pub scale: f32,
    /// Scaled template width.
    pub width: usize,
    /// Scaled template height.
    pub height: usize,
}

/// Report value recorded for a hole that needs attention.
#[derive(Clone, Debug, PartialEq)]
pub enum Diagnostic {
    /// Match confidence or obstruction percentage, printed with two decimals.
    Percent(f32),
    /// Fixed marker used when only a pass/fail decision exists.
    NeedsCleaning,
    /// The frame could not be judged; the text explains why.
    Indeterminate(String),
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Percent(value) => write!(f, "{value:.2}%"),
            Self::NeedsCleaning => f.write_str("Yes"),
            Self::Indeterminate(reason) => f.write_str(reason),
        }
    }
}

/// Outcome of scoring one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct MatchResult {
    /// Hole shown in the frame.
    pub hole: HoleId,
    /// Raw decision score (correlation, match count, or inlier count).
    pub score: f32,
    /// Score expressed on the reporting scale (percent for correlation).
    pub confidence: f32,
    /// True when the hole looks like the baseline.
    pub matched: bool,
    /// Best placement, when the strategy localizes the template.
    pub location: Option<MatchLocation>,
    /// Defect-log value; present exactly when `matched` is false.
    pub diagnostic: Option<Diagnostic>,
}

/// Matcher capability shared by both strategies.
pub trait FrameMatcher {
    /// Scores `frame` for `hole`.
    fn match_frame(&self, hole: &HoleId, frame: ImageView<'_, u8>) -> MatchResult;

    /// Column titles for the defect report.
    fn report_header(&self) -> [&'static str; 2];
}

/// Configuration-selected matching strategy.
pub enum InspectionMatcher {
    Region(RegionMatcher),
    Feature(FeatureMatcher),
}

impl InspectionMatcher {
    /// Short strategy name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Region(_) => "region",
            Self::Feature(_) => "feature",
        }
    }
}

impl FrameMatcher for InspectionMatcher {
    fn match_frame(&self, hole: &HoleId, frame: ImageView<'_, u8>) -> MatchResult {
        match self {
            Self::Region(m) => m.match_frame(hole, frame),
            Self::Feature(m) => m.match_frame(hole, frame),
        }
    }

    fn report_header(&self) -> [&'static str; 2] {
        match self {
            Self::Region(m) => m.report_header(),
            Self::Feature(m) => m.report_header(),
        }
    }
}
