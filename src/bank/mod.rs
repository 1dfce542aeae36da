//! Precomputed scaled templates for the multi-scale sweep.
//!
//! The baseline template is fixed for a whole run while hundreds of frames
//! are scored against it, so each resized variant and its correlation plan
//! is built at most once. Slots live in `OnceLock`s so a bank can be shared
//! across threads when the parallel kernel is enabled.

mod scales;

pub use scales::ScaleGrid;

use crate::image::resize::resize_u8_bilinear;
use crate::image::OwnedImage;
use crate::template::{BaselineTemplate, TemplatePlan};
use crate::util::HoleCheckResult;
use std::sync::OnceLock;

/// Template resized to one scale of the grid.
#[derive(Debug)]
pub struct ScaledTemplate {
    scale: f32,
    img: OwnedImage,
    plan: TemplatePlan,
}

impl ScaledTemplate {
    /// Scale factor relative to the baseline template.
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Resized template pixels.
    pub fn image(&self) -> &OwnedImage {
        &self.img
    }

    /// Correlation plan for the resized template.
    pub fn plan(&self) -> &TemplatePlan {
        &self.plan
    }
}

/// Lazily populated bank of scaled templates.
pub struct ScaleBank {
    template: BaselineTemplate,
    grid: ScaleGrid,
    slots: Vec<OnceLock<Option<ScaledTemplate>>>,
}

impl ScaleBank {
    /// Compiles a bank over `grid`.
    ///
    /// The template itself must have non-zero variance; resized variants that
    /// collapse to a flat or empty image are reported as unavailable.
    pub fn compile(template: BaselineTemplate, grid: ScaleGrid) -> HoleCheckResult<Self> {
        TemplatePlan::from_view(template.view())?;
        let slots = (0..grid.len()).map(|_| OnceLock::new()).collect();
        Ok(Self {
            template,
            grid,
            slots,
        })
    }

    /// Returns the scale grid.
    pub fn grid(&self) -> &ScaleGrid {
        &self.grid
    }

    /// Returns the unscaled template.
    pub fn template(&self) -> &BaselineTemplate {
        &self.template
    }

    /// Returns the template resized to scale `idx`, building it on first use.
    ///
    /// `None` when the index is out of range or the resized template is
    /// unusable for correlation.
    pub fn scaled(&self, idx: usize) -> Option<&ScaledTemplate> {
        let scale = self.grid.scale_at(idx)?;
        let slot = self.slots.get(idx)?;
        slot.get_or_init(|| {
            let img = resize_u8_bilinear(self.template.view(), scale).ok()?;
            let plan = TemplatePlan::from_view(img.view()).ok()?;
            Some(ScaledTemplate { scale, img, plan })
        })
        .as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::{ScaleBank, ScaleGrid};
    use crate::template::BaselineTemplate;

    #[test]
    fn scaled_templates_are_cached() {
        let data: Vec<u8> = (0..100).map(|v| (v * 7 % 251) as u8).collect();
        let tpl = BaselineTemplate::new(data, 10, 10).unwrap();
        let bank = ScaleBank::compile(tpl, ScaleGrid::new(0.5, 1.5, 3).unwrap()).unwrap();

        let first = bank.scaled(2).unwrap() as *const _;
        let second = bank.scaled(2).unwrap() as *const _;
        assert_eq!(first, second);
        assert_eq!(bank.scaled(0).unwrap().image().width(), 5);
        assert_eq!(bank.scaled(1).unwrap().plan().width(), 10);
        assert!(bank.scaled(3).is_none());
    }

    #[test]
    fn flat_template_fails_to_compile() {
        let tpl = BaselineTemplate::new(vec![5u8; 16], 4, 4).unwrap();
        assert!(ScaleBank::compile(tpl, ScaleGrid::single(1.0).unwrap()).is_err());
    }
}
