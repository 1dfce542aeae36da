//! Feature-based matcher.
//!
//! Keypoints of the full baseline image are matched against each frame
//! with LSH 2-NN search and the ratio test. The surviving matches decide the
//! hole either by count alone or through a RANSAC homography; a failed
//! geometric check reports how much of the baseline foreground is missing.

use crate::features::{
    coverage_estimate, extract, fit_ransac, ratio_test, DetectorConfig, Features, LshIndex,
    LshParams, RansacConfig,
};
use crate::hole::HoleId;
use crate::image::OwnedImage;
use crate::search::{Diagnostic, FrameMatcher, MatchResult};
use crate::trace::{trace_event, trace_span, trace_warn};
use crate::util::{HoleCheckError, HoleCheckResult};
use crate::ImageView;

/// How surviving matches decide a hole.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeatureDecision {
    /// Clean when at least `min_count_matches` matches pass the ratio test.
    Count,
    /// Clean when a homography with more than `min_inliers - 1` inliers fits.
    Geometric,
}

/// Feature matcher parameters.
#[derive(Clone, Debug)]
pub struct FeatureMatchConfig {
    pub decision: FeatureDecision,
    /// Lowe ratio; the nearest hit must be strictly closer than `ratio`
    /// times the second.
    pub ratio: f32,
    pub min_count_matches: usize,
    /// Matches needed before a homography is attempted.
    pub min_geometric_matches: usize,
    /// Inliers needed for a geometric pass.
    pub min_inliers: usize,
    /// RANSAC reprojection tolerance in pixels.
    pub reprojection_tolerance: f64,
    pub ransac_iters: usize,
    pub seed: u64,
    pub max_keypoints: usize,
    pub fast_threshold: u8,
    pub lsh_tables: usize,
    pub lsh_key_bits: usize,
}

impl Default for FeatureMatchConfig {
    fn default() -> Self {
        Self {
            decision: FeatureDecision::Count,
            ratio: 0.7,
            min_count_matches: 4,
            min_geometric_matches: 5,
            min_inliers: 4,
            reprojection_tolerance: 5.0,
            ransac_iters: 2000,
            seed: 0,
            max_keypoints: 500,
            fast_threshold: 20,
            lsh_tables: 6,
            lsh_key_bits: 12,
        }
    }
}

impl FeatureMatchConfig {
    fn detector(&self) -> DetectorConfig {
        DetectorConfig {
            max_keypoints: self.max_keypoints,
            fast_threshold: self.fast_threshold,
            ..DetectorConfig::default()
        }
    }
}

/// Match statistics for one frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FeatureOutcome {
    /// Matches that passed the ratio test.
    pub good_matches: usize,
    /// Homography inliers; zero unless a homography was attempted.
    pub inliers: usize,
    pub homography_found: bool,
    pub matched: bool,
}

/// Matcher holding the baseline image and its precomputed features.
pub struct FeatureMatcher {
    source: OwnedImage,
    source_features: Features,
    cfg: FeatureMatchConfig,
}

impl FeatureMatcher {
    /// Builds a matcher with the default configuration.
    pub fn new(source: OwnedImage) -> HoleCheckResult<Self> {
        Self::with_config(source, FeatureMatchConfig::default())
    }

    /// Builds a matcher; fails when the baseline yields no descriptors.
    pub fn with_config(source: OwnedImage, cfg: FeatureMatchConfig) -> HoleCheckResult<Self> {
        let source_features = extract(source.view(), &cfg.detector())?;
        if source_features.is_empty() {
            return Err(HoleCheckError::NoDescriptors { which: "source" });
        }
        Ok(Self {
            source,
            source_features,
            cfg,
        })
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &FeatureMatchConfig {
        &self.cfg
    }

    /// Number of baseline keypoints.
    pub fn source_keypoints(&self) -> usize {
        self.source_features.len()
    }

    /// Matches `frame` against the baseline and applies the configured decision.
    ///
    /// Fails with `NoDescriptors` when the frame has no keypoints.
    pub fn evaluate(&self, frame: ImageView<'_, u8>) -> HoleCheckResult<FeatureOutcome> {
        let _span = trace_span!("feature_match").entered();
        let frame_features = extract(frame, &self.cfg.detector())?;
        if frame_features.is_empty() {
            return Err(HoleCheckError::NoDescriptors { which: "frame" });
        }

        let index = LshIndex::build(
            &frame_features.descriptors,
            LshParams {
                tables: self.cfg.lsh_tables,
                key_bits: self.cfg.lsh_key_bits,
                seed: self.cfg.seed,
            },
        );
        let mut src_pts = Vec::new();
        let mut dst_pts = Vec::new();
        for (kp, desc) in self
            .source_features
            .keypoints
            .iter()
            .zip(&self.source_features.descriptors)
        {
            let hits = index.knn2(desc);
            let [best, second] = hits.as_slice() else {
                continue;
            };
            if ratio_test(*best, *second, self.cfg.ratio) {
                let other = frame_features.keypoints[best.index];
                src_pts.push([kp.x as f64, kp.y as f64]);
                dst_pts.push([other.x as f64, other.y as f64]);
            }
        }
        let good_matches = src_pts.len();

        let outcome = match self.cfg.decision {
            FeatureDecision::Count => FeatureOutcome {
                good_matches,
                inliers: 0,
                homography_found: false,
                matched: good_matches >= self.cfg.min_count_matches,
            },
            FeatureDecision::Geometric => {
                let fit = if good_matches >= self.cfg.min_geometric_matches {
                    fit_ransac(
                        &src_pts,
                        &dst_pts,
                        &RansacConfig {
                            max_iters: self.cfg.ransac_iters,
                            tolerance: self.cfg.reprojection_tolerance,
                            seed: self.cfg.seed,
                        },
                    )
                } else {
                    None
                };
                let inliers = fit.as_ref().map_or(0, |f| f.inliers);
                FeatureOutcome {
                    good_matches,
                    inliers,
                    homography_found: fit.is_some(),
                    matched: fit.is_some() && inliers >= self.cfg.min_inliers,
                }
            }
        };
        trace_event!(
            "match_decision",
            good_matches = outcome.good_matches,
            inliers = outcome.inliers,
            matched = outcome.matched
        );
        Ok(outcome)
    }

    fn coverage_diagnostic(&self, frame: ImageView<'_, u8>) -> Diagnostic {
        match coverage_estimate(self.source.view(), frame) {
            Ok(pct) => Diagnostic::Percent(pct),
            Err(err) => {
                trace_warn!("coverage estimate failed: {err}");
                Diagnostic::Indeterminate("no contour".to_string())
            }
        }
    }
}

impl FrameMatcher for FeatureMatcher {
    fn match_frame(&self, hole: &HoleId, frame: ImageView<'_, u8>) -> MatchResult {
        let result = |score: usize, matched: bool, diagnostic: Option<Diagnostic>| MatchResult {
            hole: hole.clone(),
            score: score as f32,
            confidence: score as f32,
            matched,
            location: None,
            diagnostic,
        };

        match self.evaluate(frame) {
            Ok(outcome) if outcome.matched => {
                let score = match self.cfg.decision {
                    FeatureDecision::Count => outcome.good_matches,
                    FeatureDecision::Geometric => outcome.inliers,
                };
                result(score, true, None)
            }
            Ok(outcome) => match self.cfg.decision {
                FeatureDecision::Count => {
                    result(outcome.good_matches, false, Some(Diagnostic::NeedsCleaning))
                }
                FeatureDecision::Geometric => result(
                    outcome.inliers,
                    false,
                    Some(self.coverage_diagnostic(frame)),
                ),
            },
            Err(err) => {
                trace_warn!("feature match for {hole} failed: {err}");
                let diagnostic = match (self.cfg.decision, &err) {
                    (FeatureDecision::Geometric, HoleCheckError::NoDescriptors { .. }) => {
                        self.coverage_diagnostic(frame)
                    }
                    (_, HoleCheckError::NoDescriptors { .. }) => {
                        Diagnostic::Indeterminate("no descriptors".to_string())
                    }
                    _ => Diagnostic::Indeterminate(err.to_string()),
                };
                result(0, false, Some(diagnostic))
            }
        }
    }

    fn report_header(&self) -> [&'static str; 2] {
        ["Hole Number", "Needs Cleaning"]
    }
}
