// src/utils.rs

//! Small numeric helpers shared by the encoder and the weighter.

/// Unnormalized standard Gaussian kernel: `exp(-x² / 2)`.
pub fn gaussian_kernel(x: f64) -> f64 {
    (-x * x / 2.0).exp()
}

/// Exponential smoothing kernel turning a distance into a weight:
/// `exp(-d² / (2·width²))`. Decays toward zero, never reaches it for finite `d`.
pub fn exponential_smoothing_kernel(distance: f64, width: f64) -> f64 {
    (-(distance * distance) / (2.0 * width * width)).exp()
}

/// Euclidean distance measured over the coordinates of `reference`.
///
/// Coordinates missing from `point` count as `0.0`; coordinates of `point`
/// beyond the reference length are ignored.
pub fn euclidean_distance(reference: &[f64], point: &[f64]) -> f64 {
    reference
        .iter()
        .enumerate()
        .map(|(i, &r)| {
            let p = point.get(i).copied().unwrap_or(0.0);
            (r - p).powi(2)
        })
        .sum::<f64>()
        .sqrt()
}

/// Min-max scales `value` into `[0, 1]`. A zero range maps to `1.0`, as
/// does a non-finite input. A range too wide for `f64` is scaled on halved
/// operands instead of collapsing to `1.0`.
pub fn min_max_normalize(value: f64, min: f64, max: f64) -> f64 {
    let range = max - min;
    let scaled = if range.is_infinite() && min.is_finite() && max.is_finite() {
        (value / 2.0 - min / 2.0) / (max / 2.0 - min / 2.0)
    } else {
        (value - min) / range
    };
    if scaled.is_finite() {
        scaled
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn gaussian_kernel_peaks_at_zero() {
        assert_relative_eq!(gaussian_kernel(0.0), 1.0);
        assert_relative_eq!(gaussian_kernel(0.5), (-0.125f64).exp(), epsilon = 1e-12);
        assert!(gaussian_kernel(1.0) < gaussian_kernel(0.5));
    }

    #[test]
    fn smoothing_kernel_never_hits_zero() {
        let w = exponential_smoothing_kernel(5.0, 0.75);
        assert!(w > 0.0);
        assert_relative_eq!(exponential_smoothing_kernel(0.0, 0.75), 1.0);
    }

    #[test]
    fn distance_pads_short_points_and_ignores_extra_columns() {
        assert_relative_eq!(euclidean_distance(&[1.0, 1.0], &[1.0, 1.0]), 0.0);
        assert_relative_eq!(euclidean_distance(&[1.0, 1.0], &[1.0]), 1.0);
        assert_relative_eq!(euclidean_distance(&[1.0, 1.0], &[1.0, 1.0, 0.0, 0.0]), 0.0);
        assert_relative_eq!(euclidean_distance(&[1.0, 1.0], &[0.0, 0.0]), 2f64.sqrt());
    }

    #[test]
    fn zero_range_normalizes_to_one() {
        assert_relative_eq!(min_max_normalize(3.0, 3.0, 3.0), 1.0);
        assert_relative_eq!(min_max_normalize(20.0, 10.0, 50.0), 0.25);
    }

    #[test]
    fn overflowing_range_still_scales() {
        assert_relative_eq!(min_max_normalize(f64::MAX, -f64::MAX, f64::MAX), 1.0);
        assert_relative_eq!(min_max_normalize(-f64::MAX, -f64::MAX, f64::MAX), 0.0);
        assert_relative_eq!(min_max_normalize(0.0, -f64::MAX, f64::MAX), 0.5);
        assert_relative_eq!(min_max_normalize(f64::MAX / 2.0, -f64::MAX, f64::MAX), 0.75, epsilon = 1e-12);
    }
}
