//! Scale grid for the multi-scale template sweep.

use crate::util::math::linspace;
use crate::util::{HoleCheckError, HoleCheckResult};

/// Evenly spaced scale factors over `[min, max]`, both ends included.
#[derive(Clone, Debug)]
pub struct ScaleGrid {
    scales: Vec<f32>,
}

impl ScaleGrid {
    /// Creates a grid of `steps` scales between `min` and `max`.
    pub fn new(min: f32, max: f32, steps: usize) -> HoleCheckResult<Self> {
        if !min.is_finite() || !max.is_finite() {
            return Err(HoleCheckError::InvalidScaleGrid {
                reason: "non-finite scale bounds",
            });
        }
        if min <= 0.0 {
            return Err(HoleCheckError::InvalidScaleGrid {
                reason: "scales must be > 0",
            });
        }
        if max < min {
            return Err(HoleCheckError::InvalidScaleGrid {
                reason: "max scale must not be below min scale",
            });
        }
        if steps == 0 {
            return Err(HoleCheckError::InvalidScaleGrid {
                reason: "scale grid needs at least one step",
            });
        }
        Ok(Self {
            scales: linspace(min, max, steps),
        })
    }

    /// A grid holding exactly one scale.
    pub fn single(scale: f32) -> HoleCheckResult<Self> {
        Self::new(scale, scale, 1)
    }

    /// Returns the number of scales in the grid.
    pub fn len(&self) -> usize {
        self.scales.len()
    }

    /// Returns true if the grid has no scales.
    pub fn is_empty(&self) -> bool {
        self.scales.is_empty()
    }

    /// Returns the scale at `idx`.
    pub fn scale_at(&self, idx: usize) -> Option<f32> {
        self.scales.get(idx).copied()
    }

    /// Iterates over all scales in the grid.
    pub fn iter(&self) -> impl Iterator<Item = f32> + '_ {
        self.scales.iter().copied()
    }
}
