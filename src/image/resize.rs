//! Bilinear resampling.

use crate::image::{ImageView, OwnedImage};
use crate::util::{HoleCheckError, HoleCheckResult};

/// Output size for scaling `(width, height)` by `scale`, rounded to nearest.
pub fn scaled_size(width: usize, height: usize, scale: f32) -> (usize, usize) {
    let w = (width as f32 * scale).round().max(0.0) as usize;
    let h = (height as f32 * scale).round().max(0.0) as usize;
    (w, h)
}

/// Resizes a grayscale image by a uniform factor using bilinear sampling.
///
/// Destination pixel centers map to source coordinates with the half-pixel
/// convention `src = (dst + 0.5) / scale - 0.5`, clamped to the valid range.
/// Values are rounded to the nearest integer before clamping to `[0, 255]`.
pub fn resize_u8_bilinear(src: ImageView<'_, u8>, scale: f32) -> HoleCheckResult<OwnedImage> {
    if !scale.is_finite() || scale <= 0.0 {
        return Err(HoleCheckError::InvalidInput("scale must be finite and > 0"));
    }
    let (dst_width, dst_height) = scaled_size(src.width(), src.height(), scale);
    resize_u8_bilinear_to(src, dst_width, dst_height)
}

/// Resizes a grayscale image to an explicit output size.
pub fn resize_u8_bilinear_to(
    src: ImageView<'_, u8>,
    dst_width: usize,
    dst_height: usize,
) -> HoleCheckResult<OwnedImage> {
    if dst_width == 0 || dst_height == 0 {
        return Err(HoleCheckError::InvalidDimensions {
            width: dst_width,
            height: dst_height,
        });
    }
    let width = src.width();
    let height = src.height();
    let sx = width as f32 / dst_width as f32;
    let sy = height as f32 / dst_height as f32;
    let max_x = width as f32 - 1.0;
    let max_y = height as f32 - 1.0;

    let mut out = Vec::with_capacity(dst_width * dst_height);
    for y in 0..dst_height {
        let src_y = ((y as f32 + 0.5) * sy - 0.5).clamp(0.0, max_y);
        let y0 = src_y.floor() as usize;
        let y1 = (y0 + 1).min(height - 1);
        let fy = src_y - y0 as f32;
        let (Some(row0), Some(row1)) = (src.row(y0), src.row(y1)) else {
            return Err(HoleCheckError::BufferTooSmall {
                needed: (y1 + 1) * src.stride(),
                got: src.as_slice().len(),
            });
        };
        for x in 0..dst_width {
            let src_x = ((x as f32 + 0.5) * sx - 0.5).clamp(0.0, max_x);
            let x0 = src_x.floor() as usize;
            let x1 = (x0 + 1).min(width - 1);
            let fx = src_x - x0 as f32;

            let a = row0[x0] as f32;
            let b = row0[x1] as f32;
            let c = row1[x0] as f32;
            let d = row1[x1] as f32;
            let top = a + (b - a) * fx;
            let bottom = c + (d - c) * fx;
            let value = top + (bottom - top) * fy;
            out.push(value.round().clamp(0.0, 255.0) as u8);
        }
    }

    OwnedImage::new(out, dst_width, dst_height)
}
