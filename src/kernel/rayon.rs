//! Rayon-parallel kernel (feature-gated).
//!
//! Rows of placements are scored on separate threads; per-row winners are
//! merged with the same tie-breaking as the scalar kernel, so results are
//! identical to the sequential scan.

use crate::candidate::{keep_best, Peak};
use crate::kernel::scalar::{check_fits, window_score};
use crate::kernel::ScanParams;
use crate::template::TemplatePlan;
use crate::util::HoleCheckResult;
use crate::ImageView;
use rayon::prelude::*;

/// Row-parallel best-peak scan for the ZNCC kernel.
pub fn zncc_scan_best_par(
    image: ImageView<'_, u8>,
    tpl: &TemplatePlan,
    scale_idx: usize,
    params: ScanParams,
) -> HoleCheckResult<Option<Peak>> {
    check_fits(image, tpl)?;
    let max_x = image.width() - tpl.width();
    let max_y = image.height() - tpl.height();

    let row_best: Vec<Option<Peak>> = (0..=max_y)
        .into_par_iter()
        .map(|y| {
            let mut best = None;
            for x in 0..=max_x {
                let score = window_score(image, tpl, x, y, params.min_var_i);
                if score == f32::NEG_INFINITY {
                    continue;
                }
                best = keep_best(
                    best,
                    Peak {
                        x,
                        y,
                        score,
                        scale_idx,
                    },
                );
            }
            best
        })
        .collect();

    Ok(row_best.into_iter().flatten().fold(None, keep_best))
}
