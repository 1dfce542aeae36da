//! Homography estimation: normalized DLT plus a seeded RANSAC loop.

use nalgebra::{DMatrix, Matrix3, SymmetricEigen, Vector3};
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::SeedableRng;

/// RANSAC parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RansacConfig {
    /// Maximum number of minimal-sample iterations.
    pub max_iters: usize,
    /// Inlier threshold on reprojection error, in pixels.
    pub tolerance: f64,
    /// Seed for sample selection.
    pub seed: u64,
}

impl Default for RansacConfig {
    fn default() -> Self {
        Self {
            max_iters: 2000,
            tolerance: 5.0,
            seed: 0,
        }
    }
}

/// Fitted homography with its consensus set.
#[derive(Clone, Debug)]
pub struct HomographyFit {
    /// Maps source points to destination points.
    pub h: Matrix3<f64>,
    /// Number of inliers under the refined model.
    pub inliers: usize,
    /// Inlier flag per correspondence.
    pub mask: Vec<bool>,
}

/// Projects `(x, y)` through `h`. Returns `None` at infinity.
pub fn project(h: &Matrix3<f64>, x: f64, y: f64) -> Option<[f64; 2]> {
    let p = h * Vector3::new(x, y, 1.0);
    if p[2].abs() < 1e-12 {
        return None;
    }
    Some([p[0] / p[2], p[1] / p[2]])
}

fn reprojection_error(h: &Matrix3<f64>, src: [f64; 2], dst: [f64; 2]) -> f64 {
    match project(h, src[0], src[1]) {
        Some(p) => ((p[0] - dst[0]).powi(2) + (p[1] - dst[1]).powi(2)).sqrt(),
        None => f64::INFINITY,
    }
}

/// Translates the centroid to the origin and scales the mean radius to sqrt(2).
fn normalize(pts: &[[f64; 2]]) -> (Matrix3<f64>, Vec<[f64; 2]>) {
    let n = pts.len() as f64;
    let cx = pts.iter().map(|p| p[0]).sum::<f64>() / n;
    let cy = pts.iter().map(|p| p[1]).sum::<f64>() / n;
    let mean_dist = pts
        .iter()
        .map(|p| ((p[0] - cx).powi(2) + (p[1] - cy).powi(2)).sqrt())
        .sum::<f64>()
        / n;
    let s = if mean_dist > 1e-12 {
        std::f64::consts::SQRT_2 / mean_dist
    } else {
        1.0
    };
    let t = Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0);
    let out = pts.iter().map(|p| [s * (p[0] - cx), s * (p[1] - cy)]).collect();
    (t, out)
}

/// Direct linear transform from at least four correspondences.
pub fn estimate_dlt(src: &[[f64; 2]], dst: &[[f64; 2]]) -> Option<Matrix3<f64>> {
    let n = src.len();
    if n < 4 || dst.len() != n {
        return None;
    }
    let (t_src, src_n) = normalize(src);
    let (t_dst, dst_n) = normalize(dst);

    let mut a = DMatrix::<f64>::zeros(2 * n, 9);
    for i in 0..n {
        let [sx, sy] = src_n[i];
        let [dx, dy] = dst_n[i];
        a[(2 * i, 3)] = -sx;
        a[(2 * i, 4)] = -sy;
        a[(2 * i, 5)] = -1.0;
        a[(2 * i, 6)] = dy * sx;
        a[(2 * i, 7)] = dy * sy;
        a[(2 * i, 8)] = dy;

        a[(2 * i + 1, 0)] = sx;
        a[(2 * i + 1, 1)] = sy;
        a[(2 * i + 1, 2)] = 1.0;
        a[(2 * i + 1, 6)] = -dx * sx;
        a[(2 * i + 1, 7)] = -dx * sy;
        a[(2 * i + 1, 8)] = -dx;
    }

    // Null vector of A is the eigenvector of AᵀA with the smallest eigenvalue.
    let eig = SymmetricEigen::new(a.transpose() * &a);
    let min_idx = (0..9).min_by(|&i, &j| {
        eig.eigenvalues[i]
            .abs()
            .total_cmp(&eig.eigenvalues[j].abs())
    })?;
    let v = eig.eigenvectors.column(min_idx);
    let h_norm = Matrix3::new(v[0], v[1], v[2], v[3], v[4], v[5], v[6], v[7], v[8]);

    let h = t_dst.try_inverse()? * h_norm * t_src;
    let scale = h[(2, 2)];
    if !h.iter().all(|v| v.is_finite()) {
        return None;
    }
    Some(if scale.abs() > 1e-12 { h / scale } else { h })
}

fn consensus(h: &Matrix3<f64>, src: &[[f64; 2]], dst: &[[f64; 2]], tol: f64) -> Vec<bool> {
    src.iter()
        .zip(dst)
        .map(|(&s, &d)| reprojection_error(h, s, d) < tol)
        .collect()
}

/// Robustly fits a homography. Returns `None` with fewer than four
/// correspondences or when no sample produces a usable model.
pub fn fit_ransac(src: &[[f64; 2]], dst: &[[f64; 2]], cfg: &RansacConfig) -> Option<HomographyFit> {
    let n = src.len();
    if n < 4 || dst.len() != n {
        return None;
    }

    let mut rng = StdRng::seed_from_u64(cfg.seed);
    let mut best: Option<(Matrix3<f64>, Vec<bool>, usize)> = None;

    for _ in 0..cfg.max_iters.max(1) {
        let idx = sample(&mut rng, n, 4);
        let s4: Vec<[f64; 2]> = idx.iter().map(|i| src[i]).collect();
        let d4: Vec<[f64; 2]> = idx.iter().map(|i| dst[i]).collect();
        let Some(h) = estimate_dlt(&s4, &d4) else {
            continue;
        };
        let mask = consensus(&h, src, dst, cfg.tolerance);
        let count = mask.iter().filter(|&&m| m).count();
        if best.as_ref().map_or(true, |(_, _, c)| count > *c) {
            let done = count * 10 > n * 9;
            best = Some((h, mask, count));
            if done {
                break;
            }
        }
    }

    let (h, mask, count) = best?;
    if count < 4 {
        return Some(HomographyFit {
            h,
            inliers: count,
            mask,
        });
    }

    let in_src: Vec<[f64; 2]> = (0..n).filter(|&i| mask[i]).map(|i| src[i]).collect();
    let in_dst: Vec<[f64; 2]> = (0..n).filter(|&i| mask[i]).map(|i| dst[i]).collect();
    let refined = estimate_dlt(&in_src, &in_dst).unwrap_or(h);
    let refined_mask = consensus(&refined, src, dst, cfg.tolerance);
    let refined_count = refined_mask.iter().filter(|&&m| m).count();
    if refined_count >= count {
        Some(HomographyFit {
            h: refined,
            inliers: refined_count,
            mask: refined_mask,
        })
    } else {
        Some(HomographyFit {
            h,
            inliers: count,
            mask,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{estimate_dlt, fit_ransac, project, RansacConfig};
    use approx::assert_relative_eq;
    use nalgebra::Matrix3;

    fn truth() -> Matrix3<f64> {
        Matrix3::new(1.05, 0.02, 12.0, -0.03, 0.97, -7.0, 1e-4, -5e-5, 1.0)
    }

    fn grid() -> Vec<[f64; 2]> {
        let mut pts = Vec::new();
        for y in 0..5 {
            for x in 0..6 {
                pts.push([x as f64 * 20.0 + 3.0, y as f64 * 17.0 + 5.0]);
            }
        }
        pts
    }

    #[test]
    fn dlt_recovers_exact_homography() {
        let h = truth();
        let src = grid();
        let dst: Vec<[f64; 2]> = src.iter().map(|p| project(&h, p[0], p[1]).unwrap()).collect();
        let est = estimate_dlt(&src, &dst).unwrap();
        for (a, b) in est.iter().zip(h.iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-6);
        }
    }

    #[test]
    fn ransac_rejects_outliers() {
        let h = truth();
        let src = grid();
        let mut dst: Vec<[f64; 2]> = src.iter().map(|p| project(&h, p[0], p[1]).unwrap()).collect();
        dst[3] = [500.0, -40.0];
        dst[11] = [-90.0, 300.0];
        dst[20] = [0.0, 0.0];
        let fit = fit_ransac(&src, &dst, &RansacConfig::default()).unwrap();
        assert_eq!(fit.inliers, src.len() - 3);
        assert!(!fit.mask[3] && !fit.mask[11] && !fit.mask[20]);
    }

    #[test]
    fn too_few_points_is_none() {
        let pts = [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]];
        assert!(fit_ransac(&pts, &pts, &RansacConfig::default()).is_none());
    }
}
