//! Baseline template store.
//!
//! The template is cropped once from the known-good baseline image and stays
//! immutable for the whole run; every captured frame is scored against it.

use crate::image::io::load_gray_image;
use crate::image::{ImageView, OwnedImage};
use crate::trace::trace_event;
use crate::util::{HoleCheckError, HoleCheckResult};
use std::path::Path;

mod plan;

pub use plan::TemplatePlan;

/// Crop rectangle description relative to a center point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CropSpec {
    /// Center column in the baseline image.
    pub center_x: i64,
    /// Center row in the baseline image.
    pub center_y: i64,
    /// Crop width in pixels.
    pub width: usize,
    /// Crop height in pixels.
    pub height: usize,
    /// Horizontal shift applied to the crop origin.
    pub offset_x: i64,
    /// Vertical shift applied to the crop origin.
    pub offset_y: i64,
}

impl Default for CropSpec {
    fn default() -> Self {
        Self {
            center_x: 150,
            center_y: 150,
            width: 50,
            height: 50,
            offset_x: -15,
            offset_y: -45,
        }
    }
}

impl CropSpec {
    /// Top-left corner of the crop: `center - size / 2 + offset`, truncated
    /// toward zero.
    pub fn origin(&self) -> (i64, i64) {
        let x0 = (self.center_x as f64 - self.width as f64 / 2.0 + self.offset_x as f64).trunc();
        let y0 = (self.center_y as f64 - self.height as f64 / 2.0 + self.offset_y as f64).trunc();
        (x0 as i64, y0 as i64)
    }
}

/// Immutable grayscale matching template.
#[derive(Clone, Debug)]
pub struct BaselineTemplate {
    img: OwnedImage,
}

impl BaselineTemplate {
    /// Wraps an already-cropped grayscale buffer.
    pub fn new(data: Vec<u8>, width: usize, height: usize) -> HoleCheckResult<Self> {
        let img = OwnedImage::new(data, width, height)?;
        Ok(Self { img })
    }

    /// Crops the template region out of a baseline image.
    ///
    /// Fails with `OutOfBounds` unless the whole rectangle lies inside the
    /// source image.
    pub fn crop(source: ImageView<'_, u8>, spec: &CropSpec) -> HoleCheckResult<Self> {
        let (x0, y0) = spec.origin();
        trace_event!("template_crop", x0 = x0, y0 = y0);

        let out_of_bounds = HoleCheckError::OutOfBounds {
            x: x0,
            y: y0,
            width: spec.width,
            height: spec.height,
            img_width: source.width(),
            img_height: source.height(),
        };
        if x0 < 0 || y0 < 0 || spec.width == 0 || spec.height == 0 {
            return Err(out_of_bounds);
        }
        let roi = source
            .roi(x0 as usize, y0 as usize, spec.width, spec.height)
            .map_err(|_| out_of_bounds)?;
        Ok(Self {
            img: OwnedImage::from_view(roi),
        })
    }

    /// Loads the baseline image from disk and crops the template from it.
    ///
    /// Fails with `NotFound` when the file is missing.
    pub fn from_file<P: AsRef<Path>>(path: P, spec: &CropSpec) -> HoleCheckResult<Self> {
        let source = load_gray_image(path)?;
        Self::crop(source.view(), spec)
    }

    /// Returns a borrowed view of the template data.
    pub fn view(&self) -> ImageView<'_, u8> {
        self.img.view()
    }

    /// Template width in pixels.
    pub fn width(&self) -> usize {
        self.img.width()
    }

    /// Template height in pixels.
    pub fn height(&self) -> usize {
        self.img.height()
    }
}
