//! Loading and saving frames via the `image` crate.
//!
//! Color inputs are converted to 8-bit luma on load; every algorithm in the
//! crate works on single-channel data.

use crate::image::{ImageView, OwnedImage};
use crate::util::{HoleCheckError, HoleCheckResult};
use image::GrayImage;
use std::path::Path;

/// Copies a (possibly strided) view into an `image` buffer for the
/// `imageproc` filters.
pub(crate) fn gray_from_view(view: ImageView<'_, u8>) -> GrayImage {
    let owned = OwnedImage::from_view(view);
    GrayImage::from_raw(owned.width as u32, owned.height as u32, owned.data)
        .unwrap_or_else(|| GrayImage::new(view.width() as u32, view.height() as u32))
}

/// Takes ownership of an `image` buffer without copying.
pub(crate) fn owned_from_gray(img: GrayImage) -> OwnedImage {
    let width = img.width() as usize;
    let height = img.height() as usize;
    OwnedImage {
        data: img.into_raw(),
        width,
        height,
    }
}

/// Creates an owned image from a grayscale image buffer.
pub fn owned_from_gray_image(img: &image::GrayImage) -> HoleCheckResult<OwnedImage> {
    OwnedImage::new(
        img.as_raw().clone(),
        img.width() as usize,
        img.height() as usize,
    )
}

/// Creates an owned grayscale image from a dynamic image.
pub fn owned_from_dynamic_image(img: &image::DynamicImage) -> HoleCheckResult<OwnedImage> {
    owned_from_gray_image(&img.to_luma8())
}

/// Loads an image from disk and converts it to a grayscale owned image.
///
/// Missing files map to `NotFound`; undecodable files to `ImageLoad`.
pub fn load_gray_image<P: AsRef<Path>>(path: P) -> HoleCheckResult<OwnedImage> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(HoleCheckError::NotFound {
            path: path.display().to_string(),
        });
    }
    let img = image::open(path).map_err(|err| HoleCheckError::ImageLoad {
        path: path.display().to_string(),
        reason: err.to_string(),
    })?;
    owned_from_dynamic_image(&img)
}

/// Saves a grayscale image; the format follows the file extension.
pub fn save_gray_image<P: AsRef<Path>>(img: &OwnedImage, path: P) -> HoleCheckResult<()> {
    let path = path.as_ref();
    let buf = image::GrayImage::from_raw(img.width() as u32, img.height() as u32, img.data().to_vec())
        .ok_or(HoleCheckError::InvalidDimensions {
            width: img.width(),
            height: img.height(),
        })?;
    buf.save(path).map_err(|err| HoleCheckError::Io {
        context: format!("saving {}", path.display()),
        reason: err.to_string(),
    })
}
