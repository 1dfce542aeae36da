//! Neighborhood filters shared by the focus gate, the center detector and
//! the feature pipeline, built on `imageproc`.
//!
//! Every filter replicates border pixels.

use crate::image::io::{gray_from_view, owned_from_gray};
use crate::image::{ImageView, OwnedImage};
use image::{GrayImage, Luma};
use imageproc::filter::{gaussian_blur_f32, laplacian_filter};
use imageproc::gradients::{horizontal_sobel, vertical_sobel};

/// Horizontal and vertical Sobel responses in row-major order.
pub struct Gradients {
    pub width: usize,
    pub height: usize,
    pub gx: Vec<f32>,
    pub gy: Vec<f32>,
}

impl Gradients {
    /// Euclidean gradient magnitude at index `idx`.
    pub fn magnitude(&self, idx: usize) -> f32 {
        self.gx[idx].hypot(self.gy[idx])
    }
}

fn widen(img: &image::ImageBuffer<Luma<i16>, Vec<i16>>) -> Vec<f32> {
    img.as_raw().iter().map(|&v| v as f32).collect()
}

/// 3x3 Sobel gradients.
pub fn sobel_gray(img: &GrayImage) -> Gradients {
    Gradients {
        width: img.width() as usize,
        height: img.height() as usize,
        gx: widen(&horizontal_sobel(img)),
        gy: widen(&vertical_sobel(img)),
    }
}

/// 4-neighbor discrete Laplacian (`[0 1 0; 1 -4 1; 0 1 0]`).
pub fn laplacian(src: ImageView<'_, u8>) -> Vec<f64> {
    laplacian_filter(&gray_from_view(src))
        .as_raw()
        .iter()
        .map(|&v| v as f64)
        .collect()
}

/// Gaussian blur with standard deviation `sigma`.
pub fn gaussian_blur(src: ImageView<'_, u8>, sigma: f32) -> OwnedImage {
    owned_from_gray(gaussian_blur_f32(&gray_from_view(src), sigma))
}

/// Otsu's threshold: the level maximizing between-class variance.
pub fn otsu_level(src: ImageView<'_, u8>) -> u8 {
    imageproc::contrast::otsu_level(&gray_from_view(src))
}

/// Binary image: `255` where the pixel is strictly above `level`, else `0`.
pub fn binarize_above(src: ImageView<'_, u8>, level: u8) -> GrayImage {
    let mut img = gray_from_view(src);
    for p in img.pixels_mut() {
        p[0] = if p[0] > level { 255 } else { 0 };
    }
    img
}

/// Bitwise inversion of every pixel.
pub fn invert(src: ImageView<'_, u8>) -> OwnedImage {
    let mut out = OwnedImage::from_view(src);
    for v in out.data.iter_mut() {
        *v = 255 - *v;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{binarize_above, gaussian_blur, invert, laplacian, otsu_level, sobel_gray};
    use crate::image::io::gray_from_view;
    use crate::image::ImageView;

    #[test]
    fn laplacian_of_flat_image_is_zero() {
        let data = vec![9u8; 25];
        let view = ImageView::from_slice(&data, 5, 5).unwrap();
        assert!(laplacian(view).iter().all(|v| *v == 0.0));
    }

    #[test]
    fn laplacian_responds_to_a_spike() {
        let mut data = vec![0u8; 25];
        data[12] = 10;
        let view = ImageView::from_slice(&data, 5, 5).unwrap();
        let lap = laplacian(view);
        assert_eq!(lap[12], -40.0);
        assert_eq!(lap[7], 10.0);
        assert_eq!(lap[0], 0.0);
    }

    #[test]
    fn sobel_sees_vertical_step() {
        let mut data = vec![0u8; 36];
        for y in 0..6 {
            for x in 3..6 {
                data[y * 6 + x] = 100;
            }
        }
        let view = ImageView::from_slice(&data, 6, 6).unwrap();
        let g = sobel_gray(&gray_from_view(view));
        let idx = 2 * 6 + 2;
        assert!(g.gx[idx] > 0.0);
        assert_eq!(g.gy[idx], 0.0);
        assert_eq!(g.magnitude(idx), g.gx[idx]);
    }

    #[test]
    fn otsu_splits_bimodal() {
        let mut data = vec![20u8; 50];
        data.extend(vec![200u8; 50]);
        let view = ImageView::from_slice(&data, 10, 10).unwrap();
        let level = otsu_level(view);
        assert!((20..200).contains(&level));
        let bin = binarize_above(view, level);
        assert_eq!(bin.as_raw().iter().filter(|&&v| v == 255).count(), 50);
    }

    #[test]
    fn blur_keeps_flat_images_flat() {
        let data = vec![77u8; 64];
        let view = ImageView::from_slice(&data, 8, 8).unwrap();
        let out = gaussian_blur(view, 2.0);
        assert!(out.data().iter().all(|&v| v.abs_diff(77) <= 1));
    }

    #[test]
    fn invert_flips_intensities() {
        let data = [0u8, 255, 10, 245];
        let view = ImageView::from_slice(&data, 2, 2).unwrap();
        assert_eq!(invert(view).data(), &[255, 0, 245, 10]);
    }
}
