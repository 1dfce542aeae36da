//! Correlation kernel implementations.

use crate::candidate::Peak;
use crate::util::HoleCheckResult;
use crate::ImageView;

/// Scan configuration for kernel evaluations.
#[derive(Clone, Copy, Debug)]
pub struct ScanParams {
    /// Minimum variance of the image window; flatter windows are skipped.
    pub min_var_i: f32,
}

impl Default for ScanParams {
    fn default() -> Self {
        Self { min_var_i: 1e-8 }
    }
}

/// Kernel trait for scoring and scan operations.
pub trait Kernel {
    type Plan;

    /// Computes the score at a single placement (top-left coordinates).
    fn score_at(
        image: ImageView<'_, u8>,
        plan: &Self::Plan,
        x: usize,
        y: usize,
        min_var_i: f32,
    ) -> f32;

    /// Scans every valid placement and returns the best peak, if any window
    /// produced a finite score.
    fn scan_best(
        image: ImageView<'_, u8>,
        plan: &Self::Plan,
        scale_idx: usize,
        params: ScanParams,
    ) -> HoleCheckResult<Option<Peak>>;
}

pub mod scalar;

#[cfg(feature = "rayon")]
pub mod rayon;
