//! Scalar reference kernel for zero-mean normalized cross-correlation.
//!
//! The score at a placement is
//! `sum(t' * I) / sqrt(var_t * (sum(I^2) - sum(I)^2 / n))`, which lies in
//! `[-1, 1]` and reaches 1 for an exact (affine-intensity) match.

use crate::candidate::{keep_best, Peak};
use crate::kernel::{Kernel, ScanParams};
use crate::template::TemplatePlan;
use crate::util::{HoleCheckError, HoleCheckResult};
use crate::ImageView;

/// Scalar ZNCC kernel.
pub struct ZnccScalar;

pub(crate) fn check_fits(image: ImageView<'_, u8>, tpl: &TemplatePlan) -> HoleCheckResult<()> {
    if image.width() < tpl.width() || image.height() < tpl.height() {
        return Err(HoleCheckError::OutOfBounds {
            x: 0,
            y: 0,
            width: tpl.width(),
            height: tpl.height(),
            img_width: image.width(),
            img_height: image.height(),
        });
    }
    Ok(())
}

/// Score of the window whose top-left corner is `(x, y)`; the caller
/// guarantees the window lies inside the image.
#[inline]
pub(crate) fn window_score(
    image: ImageView<'_, u8>,
    tpl: &TemplatePlan,
    x: usize,
    y: usize,
    min_var_i: f32,
) -> f32 {
    let tpl_width = tpl.width();
    let t_prime = tpl.t_prime();
    let n = (tpl_width * tpl.height()) as f32;

    let mut dot = 0.0f32;
    let mut sum_i = 0.0f32;
    let mut sum_i2 = 0.0f32;
    for ty in 0..tpl.height() {
        let Some(img_row) = image.row(y + ty) else {
            return f32::NEG_INFINITY;
        };
        let base = ty * tpl_width;
        for (tx, &t) in t_prime[base..base + tpl_width].iter().enumerate() {
            let value = img_row[x + tx] as f32;
            dot += t * value;
            sum_i += value;
            sum_i2 += value * value;
        }
    }

    let var_i = sum_i2 - (sum_i * sum_i) / n;
    if var_i <= min_var_i {
        return f32::NEG_INFINITY;
    }
    let score = dot / (tpl.var_t() * var_i).sqrt();
    if score.is_finite() {
        score
    } else {
        f32::NEG_INFINITY
    }
}

impl Kernel for ZnccScalar {
    type Plan = TemplatePlan;

    fn score_at(
        image: ImageView<'_, u8>,
        tpl: &Self::Plan,
        x: usize,
        y: usize,
        min_var_i: f32,
    ) -> f32 {
        if check_fits(image, tpl).is_err() {
            return f32::NEG_INFINITY;
        }
        if x > image.width() - tpl.width() || y > image.height() - tpl.height() {
            return f32::NEG_INFINITY;
        }
        window_score(image, tpl, x, y, min_var_i)
    }

    fn scan_best(
        image: ImageView<'_, u8>,
        tpl: &Self::Plan,
        scale_idx: usize,
        params: ScanParams,
    ) -> HoleCheckResult<Option<Peak>> {
        check_fits(image, tpl)?;
        let max_x = image.width() - tpl.width();
        let max_y = image.height() - tpl.height();

        let mut best = None;
        for y in 0..=max_y {
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
        }
        Ok(best)
    }
}
