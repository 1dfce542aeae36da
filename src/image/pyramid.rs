//! Image pyramid construction for grayscale `u8` images.
//!
//! Downsampling uses a 2x2 box filter with integer rounding:
//! `dst = ((a + b + c + d) + 2) / 4`. The feature detector samples keypoints
//! on every level, which gives descriptors coarse scale invariance.

use crate::image::{ImageView, OwnedImage};
use crate::util::HoleCheckResult;

/// Owned image pyramid built from a base level.
pub struct ImagePyramid {
    levels: Vec<OwnedImage>,
}

impl ImagePyramid {
    /// Builds a pyramid from a base grayscale view.
    ///
    /// `max_levels` is clamped to at least 1 so the base level is always
    /// present. Construction stops early once a level would drop below
    /// `min_side` pixels on either axis.
    pub fn build_u8(
        base: ImageView<'_, u8>,
        max_levels: usize,
        min_side: usize,
    ) -> HoleCheckResult<Self> {
        let max_levels = max_levels.max(1);
        let mut levels = vec![OwnedImage::from_view(base)];

        while levels.len() < max_levels {
            let Some(prev) = levels.last() else {
                break;
            };
            let src = prev.view();
            let dst_width = src.width() / 2;
            let dst_height = src.height() / 2;
            if dst_width < min_side.max(1) || dst_height < min_side.max(1) {
                break;
            }

            let mut dst = vec![0u8; dst_width * dst_height];
            for y in 0..dst_height {
                let (Some(row0), Some(row1)) = (src.row(y * 2), src.row(y * 2 + 1)) else {
                    break;
                };
                for x in 0..dst_width {
                    let sum = u16::from(row0[2 * x])
                        + u16::from(row0[2 * x + 1])
                        + u16::from(row1[2 * x])
                        + u16::from(row1[2 * x + 1]);
                    dst[y * dst_width + x] = ((sum + 2) / 4) as u8;
                }
            }

            levels.push(OwnedImage::new(dst, dst_width, dst_height)?);
        }

        Ok(Self { levels })
    }

    /// Returns all pyramid levels (level 0 is the base resolution).
    pub fn levels(&self) -> &[OwnedImage] {
        &self.levels
    }

    /// Returns a view for a specific pyramid level.
    pub fn level(&self, index: usize) -> Option<ImageView<'_, u8>> {
        self.levels.get(index).map(|level| level.view())
    }

    /// Factor mapping level coordinates back to base coordinates.
    pub fn scale_of(index: usize) -> f32 {
        (1u32 << index.min(31)) as f32
    }
}
