//! Circular Hough transform by gradient voting.
//!
//! Edge pixels are the dark pixels of an inverted edge map; vote directions
//! come from the Sobel gradient of the Gaussian-smoothed grayscale frame.
//! Every edge pixel votes along both directions of its gradient for all radii
//! in range. The accumulator is smoothed, its peaks above the vote threshold
//! are visited strongest first, and each peak is refined to the mean position
//! of the votes cast around it. The radius is the distance supported by the
//! most edge pixels.

use crate::image::filter::sobel_gray;
use crate::image::io::gray_from_view;
use crate::image::ImageView;
use imageproc::filter::gaussian_blur_f32;

/// Smoothing applied to the frame before gradients are taken.
const GRADIENT_SIGMA: f32 = 2.0;
/// Half-size, in cells, of the window a peak is refined over.
const REFINE_CELLS: isize = 2;
/// Distance band around the best radius averaged into the final radius.
const RADIUS_BAND: f32 = 5.0;

/// Hough transform parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HoughParams {
    /// Inverse accumulator resolution (1.0 = one cell per pixel).
    pub dp: f32,
    /// Minimum distance between accepted centers, in pixels.
    pub min_distance: f32,
    /// Edge-map pixels darker than this are edge pixels.
    pub param1: f32,
    /// Vote threshold for centers and radius support.
    pub param2: u32,
    pub min_radius: u32,
    pub max_radius: u32,
}

/// Detected circle in pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Circle {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    /// Smoothed accumulator votes at the peak.
    pub votes: u32,
}

struct Accumulator {
    width: usize,
    height: usize,
    dp: f32,
    votes: Vec<u32>,
    sum_x: Vec<f64>,
    sum_y: Vec<f64>,
}

impl Accumulator {
    fn new(img_width: usize, img_height: usize, dp: f32) -> Self {
        let width = (img_width as f32 / dp).ceil() as usize + 1;
        let height = (img_height as f32 / dp).ceil() as usize + 1;
        Self {
            width,
            height,
            dp,
            votes: vec![0; width * height],
            sum_x: vec![0.0; width * height],
            sum_y: vec![0.0; width * height],
        }
    }

    fn vote(&mut self, px: f32, py: f32) {
        let cell = (py / self.dp) as usize * self.width + (px / self.dp) as usize;
        self.votes[cell] += 1;
        self.sum_x[cell] += px as f64;
        self.sum_y[cell] += py as f64;
    }

    /// Separable `[1 2 1] / 4` smoothing, zero outside the accumulator.
    fn smoothed(&self) -> Vec<f32> {
        let (w, h) = (self.width, self.height);
        let mut tmp = vec![0f32; w * h];
        for y in 0..h {
            for x in 0..w {
                let at = |xx: usize| self.votes[y * w + xx] as f32;
                let left = if x > 0 { at(x - 1) } else { 0.0 };
                let right = if x + 1 < w { at(x + 1) } else { 0.0 };
                tmp[y * w + x] = (left + 2.0 * at(x) + right) / 4.0;
            }
        }
        let mut out = vec![0f32; w * h];
        for y in 0..h {
            for x in 0..w {
                let up = if y > 0 { tmp[(y - 1) * w + x] } else { 0.0 };
                let down = if y + 1 < h { tmp[(y + 1) * w + x] } else { 0.0 };
                out[y * w + x] = (up + 2.0 * tmp[y * w + x] + down) / 4.0;
            }
        }
        out
    }

    /// Mean vote position in the window around `cell`.
    fn refine(&self, cell: usize) -> (f32, f32) {
        let (cx, cy) = ((cell % self.width) as isize, (cell / self.width) as isize);
        let mut n = 0u64;
        let (mut sx, mut sy) = (0f64, 0f64);
        for y in cy - REFINE_CELLS..=cy + REFINE_CELLS {
            for x in cx - REFINE_CELLS..=cx + REFINE_CELLS {
                if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
                    continue;
                }
                let idx = y as usize * self.width + x as usize;
                n += self.votes[idx] as u64;
                sx += self.sum_x[idx];
                sy += self.sum_y[idx];
            }
        }
        if n == 0 {
            return (
                (cx as f32 + 0.5) * self.dp,
                (cy as f32 + 0.5) * self.dp,
            );
        }
        ((sx / n as f64) as f32, (sy / n as f64) as f32)
    }
}

/// Returns circles in decreasing order of smoothed center votes.
///
/// `frame` supplies gradient directions and `edges` (same size, edges dark)
/// selects the voting pixels.
pub fn hough_circles(
    frame: ImageView<'_, u8>,
    edges: ImageView<'_, u8>,
    params: &HoughParams,
) -> Vec<Circle> {
    let width = frame.width();
    let height = frame.height();
    if edges.width() != width || edges.height() != height {
        return Vec::new();
    }
    let dp = params.dp.max(1.0);
    let min_r = params.min_radius.max(1);
    let max_r = params.max_radius.max(min_r);

    let grads = sobel_gray(&gaussian_blur_f32(&gray_from_view(frame), GRADIENT_SIGMA));
    let mut acc = Accumulator::new(width, height, dp);
    let mut points = Vec::new();

    for y in 0..height {
        for x in 0..width {
            match edges.get(x, y) {
                Some(&v) if (v as f32) < params.param1 => {}
                _ => continue,
            }
            let idx = y * width + x;
            let (gx, gy) = (grads.gx[idx], grads.gy[idx]);
            let norm = grads.magnitude(idx);
            if norm <= f32::EPSILON {
                continue;
            }
            points.push((x as f32, y as f32));
            let (ux, uy) = (gx / norm, gy / norm);
            for sign in [1.0f32, -1.0] {
                for r in min_r..=max_r {
                    let px = x as f32 + sign * ux * r as f32;
                    let py = y as f32 + sign * uy * r as f32;
                    if px < 0.0 || py < 0.0 || px >= width as f32 || py >= height as f32 {
                        break;
                    }
                    acc.vote(px, py);
                }
            }
        }
    }

    let smoothed = acc.smoothed();
    let peaks = local_maxima(&smoothed, acc.width, acc.height, params.param2 as f32);

    let mut found: Vec<Circle> = Vec::new();
    let min_dist_sq = params.min_distance * params.min_distance;
    for (cell, strength) in peaks {
        let (cx, cy) = acc.refine(cell);
        if found
            .iter()
            .any(|c| (c.x - cx).powi(2) + (c.y - cy).powi(2) < min_dist_sq)
        {
            continue;
        }
        if let Some(radius) = best_radius(&points, cx, cy, min_r, max_r, params.param2) {
            found.push(Circle {
                x: cx,
                y: cy,
                radius,
                votes: strength.round() as u32,
            });
        }
    }
    found
}

/// Cells above `threshold` that beat their left/up neighbors and tie-or-beat
/// their right/down neighbors, strongest first, then in raster order.
fn local_maxima(acc: &[f32], w: usize, h: usize, threshold: f32) -> Vec<(usize, f32)> {
    let at = |x: isize, y: isize| -> f32 {
        if x < 0 || y < 0 || x as usize >= w || y as usize >= h {
            0.0
        } else {
            acc[y as usize * w + x as usize]
        }
    };
    let mut out = Vec::new();
    for y in 0..h as isize {
        for x in 0..w as isize {
            let v = at(x, y);
            if v > threshold
                && v > at(x - 1, y)
                && v >= at(x + 1, y)
                && v > at(x, y - 1)
                && v >= at(x, y + 1)
            {
                out.push((y as usize * w + x as usize, v));
            }
        }
    }
    out.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    out
}

/// Radius with the most edge pixels within one pixel of it, refined to the
/// mean distance of the edge pixels near it. `None` when the best support
/// does not exceed `threshold`.
fn best_radius(
    points: &[(f32, f32)],
    cx: f32,
    cy: f32,
    min_r: u32,
    max_r: u32,
    threshold: u32,
) -> Option<f32> {
    let distances: Vec<f32> = points
        .iter()
        .map(|&(x, y)| ((x - cx).powi(2) + (y - cy).powi(2)).sqrt())
        .collect();
    let mut hist = vec![0u32; max_r as usize + 2];
    for &d in &distances {
        let bin = d.round() as usize;
        if bin + 1 >= min_r as usize && bin <= max_r as usize + 1 {
            hist[bin] += 1;
        }
    }

    let mut best: Option<(u32, u32)> = None;
    for r in min_r..=max_r {
        let r_us = r as usize;
        let support = hist[r_us - 1] + hist[r_us] + hist[r_us + 1];
        if best.map_or(true, |(_, s)| support > s) {
            best = Some((r, support));
        }
    }
    let (r, support) = best?;
    if support <= threshold {
        return None;
    }

    let (sum, count) = distances
        .iter()
        .filter(|&&d| (d - r as f32).abs() <= RADIUS_BAND)
        .fold((0f64, 0usize), |(s, n), &d| (s + d as f64, n + 1));
    if count == 0 {
        return Some(r as f32);
    }
    Some((sum / count as f64) as f32)
}
