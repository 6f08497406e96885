// src/traits.rs

use crate::core::{PredictionInput, PredictionOutput, Result};

/// A black-box model, seen only through its input/output interface.
///
/// Implementations must return exactly one [`PredictionOutput`] per input, in
/// input order.
pub trait PredictModel {
    fn predict(&self, inputs: &[PredictionInput]) -> Result<Vec<PredictionOutput>>;
}

impl<F> PredictModel for F
where
    F: Fn(&[PredictionInput]) -> Result<Vec<PredictionOutput>>,
{
    fn predict(&self, inputs: &[PredictionInput]) -> Result<Vec<PredictionOutput>> {
        self(inputs)
    }
}

/// Produces synthetic variants of a target input.
///
/// Every returned input must have the same features (names, types, order) as
/// `target`.
pub trait PerturbationGenerator {
    fn perturb(&self, target: &PredictionInput, count: usize) -> Result<Vec<PredictionInput>>;
}
