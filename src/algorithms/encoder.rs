// src/algorithms/encoder.rs

//! Turns perturbed inputs and their model outputs into a numeric training set.
//!
//! Every column answers the same question for its feature: does this
//! perturbation still look like the input being explained? Numbers are
//! compared through a Gaussian kernel on min-max scaled values, text is split
//! into one indicator column per word of the original, everything else is
//! compared by value equality.

use crate::core::{
    Dataset, Feature, FeatureType, Instance, LimeError, Output, PredictionInput, Result,
    TrainingSample,
};
use crate::utils::{gaussian_kernel, min_max_normalize};
use std::collections::HashSet;

/// Default closeness tolerance between kernelized numeric values.
pub const DEFAULT_NUMERIC_TOLERANCE: f64 = 1e-3;

/// Where an encoded column comes from.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedColumn {
    /// Position of the originating feature in the target input.
    pub feature_index: usize,
    /// Feature name, or `name:word` for text word indicators.
    pub label: String,
}

/// The encoded design matrix `x`, target vector `y` and column provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedDataset {
    pub x: Dataset,
    pub y: Instance,
    pub columns: Vec<EncodedColumn>,
}

impl EncodedDataset {
    pub fn empty() -> Self {
        EncodedDataset {
            x: Dataset::zeros((0, 0)),
            y: Instance::zeros(0),
            columns: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    pub fn n_rows(&self) -> usize {
        self.x.nrows()
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    /// The same data as row-wise `(x, y)` samples.
    pub fn training_samples(&self) -> Vec<TrainingSample> {
        self.x
            .rows()
            .into_iter()
            .zip(self.y.iter())
            .map(|(row, &y)| TrainingSample {
                x: row.to_vec(),
                y,
            })
            .collect()
    }
}

/// Rejects perturbations whose feature layout differs from the target's.
pub fn validate_shapes(target: &PredictionInput, perturbed: &[PredictionInput]) -> Result<()> {
    for (i, input) in perturbed.iter().enumerate() {
        if input.len() != target.len() {
            return Err(LimeError::ShapeMismatch(format!(
                "perturbation {} has {} features, target has {}",
                i,
                input.len(),
                target.len()
            )));
        }
        for (t, (p, o)) in input.features().iter().zip(target.features()).enumerate() {
            if p.name() != o.name() || p.feature_type() != o.feature_type() {
                return Err(LimeError::ShapeMismatch(format!(
                    "perturbation {} feature {} is '{}' ({}), target has '{}' ({})",
                    i,
                    t,
                    p.name(),
                    p.feature_type(),
                    o.name(),
                    o.feature_type()
                )));
            }
        }
    }
    Ok(())
}

type Column = (EncodedColumn, Vec<f64>);

#[derive(Debug)]
pub struct DatasetEncoder<'a> {
    perturbed_inputs: &'a [PredictionInput],
    perturbed_outputs: &'a [Output],
    target_input: &'a PredictionInput,
    target_output: Option<&'a Output>,
    numeric_tolerance: f64,
}

impl<'a> DatasetEncoder<'a> {
    pub fn new(
        perturbed_inputs: &'a [PredictionInput],
        perturbed_outputs: &'a [Output],
        target_input: &'a PredictionInput,
        target_output: Option<&'a Output>,
    ) -> Self {
        DatasetEncoder {
            perturbed_inputs,
            perturbed_outputs,
            target_input,
            target_output,
            numeric_tolerance: DEFAULT_NUMERIC_TOLERANCE,
        }
    }

    pub fn with_numeric_tolerance(mut self, tolerance: f64) -> Self {
        self.numeric_tolerance = tolerance;
        self
    }

    /// Encodes the perturbations. Shapes are checked first; after that an
    /// empty dataset is returned when there is nothing to encode (no
    /// perturbations, no target features, no target output).
    pub fn encode(&self) -> Result<EncodedDataset> {
        if self.perturbed_inputs.len() != self.perturbed_outputs.len() {
            return Err(LimeError::ShapeMismatch(format!(
                "{} perturbed inputs but {} perturbed outputs",
                self.perturbed_inputs.len(),
                self.perturbed_outputs.len()
            )));
        }
        validate_shapes(self.target_input, self.perturbed_inputs)?;

        let target_output = match self.target_output {
            Some(output) if !self.perturbed_inputs.is_empty() && !self.target_input.is_empty() => output,
            _ => return Ok(EncodedDataset::empty()),
        };

        let columns: Vec<Column> = self
            .target_input
            .features()
            .iter()
            .enumerate()
            .map(|(t, feature)| self.encode_feature(t, feature))
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .flatten()
            .collect();

        let rows = self.perturbed_outputs.len();
        let row_major: Vec<f64> = (0..rows)
            .flat_map(|r| columns.iter().map(move |(_, values)| values[r]))
            .collect();
        let x = Dataset::from_shape_vec((rows, columns.len()), row_major)?;
        let y = self
            .perturbed_outputs
            .iter()
            .map(|output| encode_target(output, target_output))
            .collect::<Result<Vec<f64>>>()?;

        Ok(EncodedDataset {
            x,
            y: Instance::from_vec(y),
            columns: columns.into_iter().map(|(column, _)| column).collect(),
        })
    }

    fn encode_feature(&self, t: usize, original: &Feature) -> Result<Vec<Column>> {
        let columns = match original.feature_type() {
            FeatureType::Number => vec![self.encode_number(t, original)?],
            FeatureType::Boolean => vec![self.encode_boolean(t, original)?],
            FeatureType::Text => self.encode_text(t, original),
            FeatureType::Categorical
            | FeatureType::Binary
            | FeatureType::Date
            | FeatureType::Time
            | FeatureType::Uri
            | FeatureType::Duration
            | FeatureType::Vector
            | FeatureType::Currency
            | FeatureType::Composite => vec![self.encode_equals(t, original)],
            FeatureType::Undefined => Vec::new(),
        };
        Ok(columns)
    }

    fn encode_number(&self, t: usize, original: &Feature) -> Result<Column> {
        let original_value = numeric_value(original)?;
        let values = self
            .perturbed_inputs
            .iter()
            .map(|input| numeric_value(&input.features()[t]))
            .collect::<Result<Vec<f64>>>()?;

        let (min, max) = values
            .iter()
            .fold((original_value, original_value), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        let threshold = gaussian_kernel(min_max_normalize(original_value, min, max));

        let encoded = values
            .iter()
            .map(|&v| gaussian_kernel(min_max_normalize(v, min, max)))
            .map(|k| if (k - threshold).abs() < self.numeric_tolerance { 1.0 } else { 0.0 })
            .collect();
        Ok((column(t, original.name()), encoded))
    }

    fn encode_boolean(&self, t: usize, original: &Feature) -> Result<Column> {
        let encoded = self
            .perturbed_inputs
            .iter()
            .map(|input| numeric_value(&input.features()[t]))
            .collect::<Result<Vec<f64>>>()?;
        Ok((column(t, original.name()), encoded))
    }

    fn encode_equals(&self, t: usize, original: &Feature) -> Column {
        let encoded = self
            .perturbed_inputs
            .iter()
            .map(|input| {
                if input.features()[t].value() == original.value() {
                    1.0
                } else {
                    0.0
                }
            })
            .collect();
        (column(t, original.name()), encoded)
    }

    fn encode_text(&self, t: usize, original: &Feature) -> Vec<Column> {
        let original_text = original.value().as_string();
        let mut seen = HashSet::new();
        let words: Vec<&str> = original_text
            .split_whitespace()
            .filter(|word| seen.insert(*word))
            .collect();

        // sorted word lists, None when the perturbed value is null
        let perturbed_words: Vec<Option<Vec<String>>> = self
            .perturbed_inputs
            .iter()
            .map(|input| {
                let value = input.features()[t].value();
                if value.is_null() {
                    return None;
                }
                let mut tokens: Vec<String> = value.as_string().split_whitespace().map(str::to_owned).collect();
                tokens.sort();
                Some(tokens)
            })
            .collect();

        words
            .into_iter()
            .map(|word| {
                let encoded = perturbed_words
                    .iter()
                    .map(|tokens| match tokens {
                        Some(tokens) if tokens.binary_search_by(|tok| tok.as_str().cmp(word)).is_ok() => 1.0,
                        _ => 0.0,
                    })
                    .collect();
                let label = format!("{}:{}", original.name(), word);
                (column(t, &label), encoded)
            })
            .collect()
    }
}

fn column(feature_index: usize, label: &str) -> EncodedColumn {
    EncodedColumn {
        feature_index,
        label: label.to_owned(),
    }
}

fn numeric_value(feature: &Feature) -> Result<f64> {
    feature.value().as_number().ok_or_else(|| {
        LimeError::InvalidValue(format!(
            "feature '{}' is declared {} but holds {}",
            feature.name(),
            feature.feature_type(),
            feature.value()
        ))
    })
}

/// Numeric outputs regress on their value; everything else becomes a
/// "reproduces the target value" indicator.
fn encode_target(output: &Output, target: &Output) -> Result<f64> {
    if target.output_type.is_numeric() {
        output.value.as_number().ok_or_else(|| {
            LimeError::InvalidValue(format!(
                "output '{}' is expected to be numeric but holds {}",
                output.name, output.value
            ))
        })
    } else {
        Ok(if output.value == target.value { 1.0 } else { 0.0 })
    }
}
