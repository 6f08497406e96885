// src/algorithms/saliency.rs

use super::encoder::EncodedColumn;
use crate::core::{Feature, FeatureImportance, Instance, LimeError, Result, Saliency};
use serde::{Deserialize, Serialize};

/// How the coefficients of a multi-column feature (text word indicators)
/// collapse into one importance score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnAggregation {
    /// Sum of the feature's column coefficients.
    #[default]
    Sum,
    /// The signed coefficient with the largest magnitude. Ties keep the
    /// earliest column.
    MaxMagnitude,
}

impl ColumnAggregation {
    fn combine(self, acc: Option<f64>, coefficient: f64) -> f64 {
        match (self, acc) {
            (_, None) => coefficient,
            (ColumnAggregation::Sum, Some(total)) => total + coefficient,
            (ColumnAggregation::MaxMagnitude, Some(best)) => {
                if coefficient.abs() > best.abs() {
                    coefficient
                } else {
                    best
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SaliencyAggregator {
    policy: ColumnAggregation,
}

impl SaliencyAggregator {
    pub fn new(policy: ColumnAggregation) -> Self {
        SaliencyAggregator { policy }
    }

    /// Folds column coefficients back onto `features`. Features without any
    /// encoded column score `0.0`.
    pub fn aggregate(
        &self,
        output_name: &str,
        features: &[Feature],
        columns: &[EncodedColumn],
        coefficients: &Instance,
    ) -> Result<Saliency> {
        if columns.len() != coefficients.len() {
            return Err(LimeError::ShapeMismatch(format!(
                "{} encoded columns but {} coefficients",
                columns.len(),
                coefficients.len()
            )));
        }

        let mut scores: Vec<Option<f64>> = vec![None; features.len()];
        for (column, &coefficient) in columns.iter().zip(coefficients.iter()) {
            let slot = scores.get_mut(column.feature_index).ok_or_else(|| {
                LimeError::ShapeMismatch(format!(
                    "column '{}' points at feature {} of {}",
                    column.label,
                    column.feature_index,
                    features.len()
                ))
            })?;
            *slot = Some(self.policy.combine(*slot, coefficient));
        }

        Ok(Saliency {
            output_name: output_name.to_owned(),
            per_feature_importance: features
                .iter()
                .zip(scores)
                .map(|(feature, score)| FeatureImportance {
                    feature: feature.clone(),
                    score: score.unwrap_or(0.0),
                })
                .collect(),
        })
    }
}
