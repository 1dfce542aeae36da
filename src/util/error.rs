//! Error types for holecheck.

use thiserror::Error;

/// Result alias for holecheck operations.
pub type HoleCheckResult<T> = std::result::Result<T, HoleCheckError>;

/// Errors that can occur while inspecting holes or driving the stage.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum HoleCheckError {
    /// The input data or parameters are invalid.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    /// Width or height is zero or overflows.
    #[error("invalid dimensions {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    /// Row stride is smaller than the row width.
    #[error("invalid stride {stride} for width {width}")]
    InvalidStride { width: usize, stride: usize },
    /// The backing buffer cannot hold the described image.
    #[error("buffer too small: needed {needed}, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    /// A crop or region of interest does not fit inside the image.
    #[error(
        "region [{x}, {y}, {width}x{height}] out of bounds for {img_width}x{img_height} image"
    )]
    OutOfBounds {
        x: i64,
        y: i64,
        width: usize,
        height: usize,
        img_width: usize,
        img_height: usize,
    },
    /// The image file does not exist.
    #[error("image not found: {path}")]
    NotFound { path: String },
    /// The image file exists but could not be decoded.
    #[error("failed to load image {path}: {reason}")]
    ImageLoad { path: String, reason: String },
    /// Template has no intensity variation, so correlation is undefined.
    #[error("degenerate template: {reason}")]
    DegenerateTemplate { reason: &'static str },
    /// Scale sweep parameters are unusable.
    #[error("invalid scale grid: {reason}")]
    InvalidScaleGrid { reason: &'static str },
    /// Thresholding produced no foreground contour.
    #[error("no contour found in {which} image")]
    NoContour { which: &'static str },
    /// Keypoint detection produced no descriptors.
    #[error("no descriptors found in {which} image")]
    NoDescriptors { which: &'static str },
    /// The controller did not acknowledge within the wait policy.
    #[error("device did not acknowledge {command} within {waited_ms} ms")]
    DeviceTimeout { command: String, waited_ms: u64 },
    /// The controller channel failed (open, write, or read).
    #[error("device error: {reason}")]
    Device { reason: String },
    /// Persisted state or configuration is missing or invalid.
    #[error("configuration error: {reason}")]
    Configuration { reason: String },
    /// Filesystem access failed.
    #[error("i/o error while {context}: {reason}")]
    Io { context: String, reason: String },
    /// A hole code did not have the expected shape.
    #[error("hole code must be exactly 5 letters or digits, got {code:?}")]
    InvalidHoleCode { code: String },
    /// The orchestrator rejected a command in its current state.
    #[error("cannot {command} while {from}")]
    InvalidStateTransition {
        from: &'static str,
        command: &'static str,
    },
}

impl HoleCheckError {
    /// Wraps an I/O failure with what was being attempted.
    pub fn io(context: impl Into<String>, err: &std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            reason: err.to_string(),
        }
    }

    /// Returns true for failures local to a single frame.
    ///
    /// These are recorded in the defect log and the batch continues.
    pub fn is_per_frame(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::ImageLoad { .. }
                | Self::NoContour { .. }
                | Self::NoDescriptors { .. }
                | Self::DegenerateTemplate { .. }
        )
    }
}
