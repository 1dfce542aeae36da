//! FAST-9 corners with intensity-centroid orientation.

use crate::image::io::gray_from_view;
use crate::image::ImageView;
use imageproc::corners::corners_fast9;
use imageproc::suppress::local_maxima;

/// Radius of the patch used for orientation.
pub(crate) const PATCH_RADIUS: isize = 15;

/// Raw corner on one pyramid level.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Corner {
    pub x: usize,
    pub y: usize,
    pub response: f32,
}

/// Detects FAST corners at least `border` pixels from the image edge,
/// keeping only local maxima of the corner score.
pub(crate) fn detect(img: ImageView<'_, u8>, threshold: u8, border: usize) -> Vec<Corner> {
    let width = img.width();
    let height = img.height();
    if width <= 2 * border || height <= 2 * border {
        return Vec::new();
    }

    let raw = corners_fast9(&gray_from_view(img), threshold);
    let mut corners: Vec<Corner> = local_maxima(&raw, 1)
        .into_iter()
        .map(|c| Corner {
            x: c.x as usize,
            y: c.y as usize,
            response: c.score,
        })
        .filter(|c| {
            c.x >= border && c.y >= border && c.x < width - border && c.y < height - border
        })
        .collect();
    corners.sort_by(|a, b| (a.y, a.x).cmp(&(b.y, b.x)));
    corners
}

/// Orientation from the intensity centroid of a circular patch, in radians.
pub(crate) fn orientation(img: ImageView<'_, u8>, x: usize, y: usize) -> f32 {
    let mut m10 = 0f64;
    let mut m01 = 0f64;
    let r2 = PATCH_RADIUS * PATCH_RADIUS;
    for dy in -PATCH_RADIUS..=PATCH_RADIUS {
        for dx in -PATCH_RADIUS..=PATCH_RADIUS {
            if dx * dx + dy * dy > r2 {
                continue;
            }
            let v = img.clamped(x as isize + dx, y as isize + dy) as f64;
            m10 += dx as f64 * v;
            m01 += dy as f64 * v;
        }
    }
    m01.atan2(m10) as f32
}
