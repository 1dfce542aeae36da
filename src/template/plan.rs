//! Template plan precomputation for zero-mean normalized correlation.

use crate::image::ImageView;
use crate::util::{HoleCheckError, HoleCheckResult};

/// Precomputed zero-mean template buffer and its energy.
#[derive(Clone, Debug)]
pub struct TemplatePlan {
    width: usize,
    height: usize,
    t_prime: Vec<f32>,
    var_t: f32,
}

impl TemplatePlan {
    /// Builds a plan from a template view.
    ///
    /// Fails with `DegenerateTemplate` when the template is flat, since the
    /// correlation coefficient is undefined for zero variance.
    pub fn from_view(tpl: ImageView<'_, u8>) -> HoleCheckResult<Self> {
        let width = tpl.width();
        let height = tpl.height();
        let count = width
            .checked_mul(height)
            .ok_or(HoleCheckError::InvalidDimensions { width, height })?;

        let mut values = Vec::with_capacity(count);
        for y in 0..height {
            let row = tpl.row(y).ok_or(HoleCheckError::BufferTooSmall {
                needed: (y + 1) * tpl.stride(),
                got: tpl.as_slice().len(),
            })?;
            values.extend(row.iter().map(|&v| v as f64));
        }

        let mean = values.iter().sum::<f64>() / count as f64;
        let var_t: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
        if var_t <= 1e-8 {
            return Err(HoleCheckError::DegenerateTemplate {
                reason: "zero variance",
            });
        }

        Ok(Self {
            width,
            height,
            t_prime: values.iter().map(|v| (v - mean) as f32).collect(),
            var_t: var_t as f32,
        })
    }

    /// Returns the template width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the template height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the zero-mean template buffer in row-major order.
    pub fn t_prime(&self) -> &[f32] {
        &self.t_prime
    }

    /// Sum of squared deviations from the template mean.
    pub fn var_t(&self) -> f32 {
        self.var_t
    }
}

#[cfg(test)]
mod tests {
    use super::TemplatePlan;
    use crate::image::ImageView;
    use crate::util::HoleCheckError;

    #[test]
    fn zero_mean_buffer_sums_to_zero() {
        let data = [1u8, 2, 3, 4, 5, 6];
        let view = ImageView::from_slice(&data, 3, 2).unwrap();
        let plan = TemplatePlan::from_view(view).unwrap();
        let sum: f32 = plan.t_prime().iter().sum();
        assert!(sum.abs() < 1e-5);
        assert!((plan.var_t() - 17.5).abs() < 1e-4);
    }

    #[test]
    fn flat_template_is_degenerate() {
        let data = [7u8; 9];
        let view = ImageView::from_slice(&data, 3, 3).unwrap();
        assert!(matches!(
            TemplatePlan::from_view(view),
            Err(HoleCheckError::DegenerateTemplate { .. })
        ));
    }
}
