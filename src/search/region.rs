//! Multi-scale region matcher.
//!
//! The baseline template is resized to each scale of an evenly spaced sweep,
//! every scale that still fits inside the frame is correlated over all
//! placements, and the single best score across the sweep decides the hole.

use crate::bank::{ScaleBank, ScaleGrid};
use crate::candidate::{keep_best, Peak};
use crate::hole::HoleId;
use crate::kernel::scalar::ZnccScalar;
use crate::kernel::{Kernel, ScanParams};
use crate::search::{Diagnostic, FrameMatcher, MatchLocation, MatchResult};
use crate::template::BaselineTemplate;
use crate::trace::{trace_event, trace_span};
use crate::util::HoleCheckResult;
use crate::ImageView;

/// Score reported when no scale of the sweep fits inside the frame.
pub const NO_SCALE_SCORE: f32 = -1.0;

/// Region matcher parameters.
#[derive(Clone, Debug)]
pub struct RegionMatchConfig {
    /// Minimum best score for a hole to count as clean.
    pub threshold: f32,
    /// Smallest template scale in the sweep.
    pub scale_min: f32,
    /// Largest template scale in the sweep.
    pub scale_max: f32,
    /// Number of evenly spaced scales, both ends included.
    pub steps: usize,
    /// Minimum variance of a frame window for it to be scored.
    pub min_var_i: f32,
    /// Use the row-parallel kernel (requires the `rayon` feature).
    pub parallel: bool,
}

impl Default for RegionMatchConfig {
    fn default() -> Self {
        Self {
            threshold: 0.6,
            scale_min: 0.8,
            scale_max: 1.2,
            steps: 20,
            min_var_i: 1e-8,
            parallel: false,
        }
    }
}

/// Raw outcome of a sweep, before it is attached to a hole.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RegionMatch {
    /// Best correlation over the sweep, or [`NO_SCALE_SCORE`].
    pub score: f32,
    /// `score >= threshold`, and false when nothing was evaluated.
    pub matched: bool,
    /// Placement and scale of the best score.
    pub location: Option<MatchLocation>,
    /// Number of scales that fit inside the frame.
    pub evaluated_scales: usize,
}

/// Correlation-based matcher over a cached scale bank.
pub struct RegionMatcher {
    bank: ScaleBank,
    cfg: RegionMatchConfig,
}

impl RegionMatcher {
    /// Builds a matcher for `template` with the default configuration.
    pub fn new(template: BaselineTemplate) -> HoleCheckResult<Self> {
        Self::with_config(template, RegionMatchConfig::default())
    }

    /// Builds a matcher with an explicit configuration.
    pub fn with_config(template: BaselineTemplate, cfg: RegionMatchConfig) -> HoleCheckResult<Self> {
        let grid = ScaleGrid::new(cfg.scale_min, cfg.scale_max, cfg.steps)?;
        let bank = ScaleBank::compile(template, grid)?;
        Ok(Self { bank, cfg })
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &RegionMatchConfig {
        &self.cfg
    }

    /// Returns the scale grid used by the sweep.
    pub fn grid(&self) -> &ScaleGrid {
        self.bank.grid()
    }

    /// Runs the scale sweep on `frame`.
    pub fn sweep(&self, frame: ImageView<'_, u8>) -> RegionMatch {
        let _span = trace_span!("region_match", scales = self.bank.grid().len()).entered();
        let params = ScanParams {
            min_var_i: self.cfg.min_var_i,
        };

        let mut best: Option<Peak> = None;
        let mut evaluated = 0usize;
        for idx in 0..self.bank.grid().len() {
            let Some(scaled) = self.bank.scaled(idx) else {
                continue;
            };
            let plan = scaled.plan();
            if plan.width() > frame.width() || plan.height() > frame.height() {
                continue;
            }
            evaluated += 1;
            if let Ok(Some(peak)) = self.scan(frame, plan, idx, params) {
                best = keep_best(best, peak);
            }
        }

        let Some(peak) = best else {
            trace_event!("match_decision", evaluated = evaluated, matched = false);
            return RegionMatch {
                score: NO_SCALE_SCORE,
                matched: false,
                location: None,
                evaluated_scales: evaluated,
            };
        };

        let location = self.bank.scaled(peak.scale_idx).map(|scaled| MatchLocation {
            x: peak.x,
            y: peak.y,
            scale: scaled.scale(),
            width: scaled.plan().width(),
            height: scaled.plan().height(),
        });
        let matched = peak.score >= self.cfg.threshold;
        trace_event!(
            "best_scale",
            scale_idx = peak.scale_idx,
            score = peak.score,
            matched = matched
        );
        RegionMatch {
            score: peak.score,
            matched,
            location,
            evaluated_scales: evaluated,
        }
    }

    #[cfg(feature = "rayon")]
    fn scan(
        &self,
        frame: ImageView<'_, u8>,
        plan: &crate::template::TemplatePlan,
        idx: usize,
        params: ScanParams,
    ) -> HoleCheckResult<Option<Peak>> {
        if self.cfg.parallel {
            crate::kernel::rayon::zncc_scan_best_par(frame, plan, idx, params)
        } else {
            ZnccScalar::scan_best(frame, plan, idx, params)
        }
    }

    #[cfg(not(feature = "rayon"))]
    fn scan(
        &self,
        frame: ImageView<'_, u8>,
        plan: &crate::template::TemplatePlan,
        idx: usize,
        params: ScanParams,
    ) -> HoleCheckResult<Option<Peak>> {
        ZnccScalar::scan_best(frame, plan, idx, params)
    }
}

impl FrameMatcher for RegionMatcher {
    fn match_frame(&self, hole: &HoleId, frame: ImageView<'_, u8>) -> MatchResult {
        let sweep = self.sweep(frame);
        let confidence = sweep.score * 100.0;
        MatchResult {
            hole: hole.clone(),
            score: sweep.score,
            confidence,
            matched: sweep.matched,
            location: sweep.location,
            diagnostic: (!sweep.matched).then_some(Diagnostic::Percent(confidence)),
        }
    }

    fn report_header(&self) -> [&'static str; 2] {
        ["Hole Number", "Percent difference from Baseline Image"]
    }
}
