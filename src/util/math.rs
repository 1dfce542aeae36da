//! Numeric helpers shared by the matchers and filters.

/// Returns `steps` evenly spaced samples over `[start, stop]`, both ends included.
///
/// A single step yields `start`; zero steps yield an empty vector.
pub(crate) fn linspace(start: f32, stop: f32, steps: usize) -> Vec<f32> {
    match steps {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (steps - 1) as f32;
            (0..steps)
                .map(|i| {
                    if i == steps - 1 {
                        stop
                    } else {
                        start + step * i as f32
                    }
                })
                .collect()
        }
    }
}

/// Population mean and variance of a sample, accumulated in `f64`.
pub(crate) fn mean_variance(values: impl IntoIterator<Item = f64>) -> (f64, f64) {
    let mut count = 0usize;
    let mut sum = 0.0f64;
    let mut sum_sq = 0.0f64;
    for v in values {
        count += 1;
        sum += v;
        sum_sq += v * v;
    }
    if count == 0 {
        return (0.0, 0.0);
    }
    let n = count as f64;
    let mean = sum / n;
    let variance = (sum_sq / n - mean * mean).max(0.0);
    (mean, variance)
}

/// Number of differing bits between two equal-length binary descriptors.
pub(crate) fn hamming(a: &[u8], b: &[u8]) -> u32 {
    a.iter().zip(b).map(|(x, y)| (x ^ y).count_ones()).sum()
}
