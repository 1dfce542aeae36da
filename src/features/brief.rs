//! Steered BRIEF binary descriptors.
//!
//! Each descriptor packs 256 intensity comparisons between point pairs of a
//! fixed pattern, rotated by the keypoint orientation, sampled on a smoothed
//! image.

use crate::image::ImageView;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::OnceLock;

/// Descriptor length in bytes (256 bits).
pub const DESCRIPTOR_BYTES: usize = 32;

/// Binary descriptor.
pub type Descriptor = [u8; DESCRIPTOR_BYTES];

const PATTERN_SEED: u64 = 0x0b71_ef5e_ed00_0001;
const PATTERN_RADIUS: i32 = 13;

fn pattern() -> &'static [[i8; 4]] {
    static PATTERN: OnceLock<Vec<[i8; 4]>> = OnceLock::new();
    PATTERN.get_or_init(|| {
        let mut rng = StdRng::seed_from_u64(PATTERN_SEED);
        let mut sample = || -> i8 {
            // Sum of two uniforms concentrates pairs near the keypoint.
            let a = rng.random_range(-PATTERN_RADIUS..=PATTERN_RADIUS);
            let b = rng.random_range(-PATTERN_RADIUS..=PATTERN_RADIUS);
            ((a + b) / 2) as i8
        };
        (0..DESCRIPTOR_BYTES * 8)
            .map(|_| {
                let mut pair = [sample(), sample(), sample(), sample()];
                while pair[0] == pair[2] && pair[1] == pair[3] {
                    pair[2] = sample();
                    pair[3] = sample();
                }
                pair
            })
            .collect()
    })
}

/// Computes the descriptor of the keypoint at `(x, y)` with orientation
/// `angle` (radians) on a pre-smoothed image.
pub(crate) fn describe(smoothed: ImageView<'_, u8>, x: usize, y: usize, angle: f32) -> Descriptor {
    let (sin_a, cos_a) = angle.sin_cos();
    let rotate = |px: i8, py: i8| -> (isize, isize) {
        let (px, py) = (px as f32, py as f32);
        let rx = (px * cos_a - py * sin_a).round() as isize;
        let ry = (px * sin_a + py * cos_a).round() as isize;
        (x as isize + rx, y as isize + ry)
    };

    let mut desc = [0u8; DESCRIPTOR_BYTES];
    for (bit, pair) in pattern().iter().enumerate() {
        let (ax, ay) = rotate(pair[0], pair[1]);
        let (bx, by) = rotate(pair[2], pair[3]);
        if smoothed.clamped(ax, ay) < smoothed.clamped(bx, by) {
            desc[bit / 8] |= 1 << (bit % 8);
        }
    }
    desc
}

#[cfg(test)]
mod tests {
    use super::{describe, pattern, DESCRIPTOR_BYTES};
    use crate::image::ImageView;
    use crate::util::math::hamming;

    #[test]
    fn pattern_is_stable_and_within_radius() {
        let p = pattern();
        assert_eq!(p.len(), DESCRIPTOR_BYTES * 8);
        assert!(p.iter().flatten().all(|v| (-13..=13).contains(v)));
        assert_eq!(p.as_ptr(), pattern().as_ptr());
    }

    #[test]
    fn identical_patches_give_identical_descriptors() {
        let data: Vec<u8> = (0..64 * 64).map(|i| ((i * 31 + i / 64 * 7) % 251) as u8).collect();
        let view = ImageView::from_slice(&data, 64, 64).unwrap();
        let a = describe(view, 32, 32, 0.3);
        let b = describe(view, 32, 32, 0.3);
        assert_eq!(hamming(&a, &b), 0);
    }
}
