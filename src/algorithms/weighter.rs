// src/algorithms/weighter.rs

use crate::core::{Dataset, Instance};
use crate::utils::{euclidean_distance, exponential_smoothing_kernel};

/// Default multiplier applied to `sqrt(num_features)` to get the kernel width.
pub const DEFAULT_KERNEL_WIDTH_FACTOR: f64 = 0.75;

/// Weighs encoded samples by how close they are to the explained input.
///
/// In encoded space the explained input is the all-ones vector: every column
/// of an unchanged perturbation encodes to `1.0`. The reference point has one
/// coordinate per *feature*, not per encoded column, so text and other
/// multi-column features are measured only on their leading columns. See
/// [`euclidean_distance`] for how lengths are reconciled.
#[derive(Debug, Clone, Copy)]
pub struct ProximityWeighter {
    kernel_width_factor: f64,
}

impl Default for ProximityWeighter {
    fn default() -> Self {
        ProximityWeighter {
            kernel_width_factor: DEFAULT_KERNEL_WIDTH_FACTOR,
        }
    }
}

impl ProximityWeighter {
    pub fn new(kernel_width_factor: f64) -> Self {
        ProximityWeighter { kernel_width_factor }
    }

    pub fn kernel_width(&self, num_features: usize) -> f64 {
        self.kernel_width_factor * (num_features as f64).sqrt()
    }

    /// One weight per row of `x`, in `(0, 1]`.
    pub fn weights(&self, num_features: usize, x: &Dataset) -> Instance {
        if num_features == 0 {
            return Instance::ones(x.nrows());
        }
        let reference = vec![1.0; num_features];
        let width = self.kernel_width(num_features);
        x.rows()
            .into_iter()
            .map(|row| {
                let distance = match row.as_slice() {
                    Some(slice) => euclidean_distance(&reference, slice),
                    None => euclidean_distance(&reference, &row.to_vec()),
                };
                exponential_smoothing_kernel(distance, width)
            })
            .collect()
    }
}
