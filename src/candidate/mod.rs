//! Correlation peaks and deterministic best-peak selection.

use std::cmp::Ordering;

/// Peak candidate in frame space for one scale of the sweep.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Peak {
    /// X coordinate (column) of the template's top-left corner.
    pub x: usize,
    /// Y coordinate (row) of the template's top-left corner.
    pub y: usize,
    /// Correlation score at the peak location.
    pub score: f32,
    /// Index into the scale grid.
    pub scale_idx: usize,
}

/// Orders peaks best-first: higher score, then smaller scale index, then
/// row-major position.
pub(crate) fn peak_cmp_desc(a: &Peak, b: &Peak) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.scale_idx.cmp(&b.scale_idx))
        .then_with(|| a.y.cmp(&b.y))
        .then_with(|| a.x.cmp(&b.x))
}

/// Keeps whichever of `current` and `candidate` ranks first.
pub(crate) fn keep_best(current: Option<Peak>, candidate: Peak) -> Option<Peak> {
    match current {
        Some(best) if peak_cmp_desc(&best, &candidate) != Ordering::Greater => Some(best),
        _ => Some(candidate),
    }
}
