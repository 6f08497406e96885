// src/core/data.rs
use super::value::{Feature, FeatureType, Value};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A numeric row (encoded sample, target vector, weights, coefficients).
pub type Instance = Array1<f64>;

/// The encoded design matrix: one row per perturbed sample.
pub type Dataset = Array2<f64>;

/// One full input vector to the model. Feature order is significant.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PredictionInput {
    features: Vec<Feature>,
}

impl PredictionInput {
    pub fn new(features: Vec<Feature>) -> Self {
        PredictionInput { features }
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn feature_by_name(&self, name: &str) -> Option<&Feature> {
        self.features.iter().find(|f| f.name() == name)
    }

    /// Flattens composite features into their leaves, depth-first. Leaves
    /// are named by their dotted path, so `home.street` and `work.street`
    /// stay distinct.
    pub fn linearized(&self) -> PredictionInput {
        PredictionInput {
            features: self.features.iter().flat_map(Feature::flattened).collect(),
        }
    }
}

impl From<Vec<Feature>> for PredictionInput {
    fn from(features: Vec<Feature>) -> Self {
        PredictionInput::new(features)
    }
}

/// One output slot of a prediction. `score` is the model's own confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Output {
    pub name: String,
    #[serde(rename = "type")]
    pub output_type: FeatureType,
    pub value: Value,
    pub score: f64,
}

impl Output {
    pub fn new(name: impl Into<String>, output_type: FeatureType, value: Value, score: f64) -> Self {
        Output {
            name: name.into(),
            output_type,
            value,
            score,
        }
    }
}

/// All output slots produced by the model for one input.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PredictionOutput {
    pub outputs: Vec<Output>,
}

impl PredictionOutput {
    pub fn new(outputs: Vec<Output>) -> Self {
        PredictionOutput { outputs }
    }

    pub fn by_name(&self, name: &str) -> Option<&Output> {
        self.outputs.iter().find(|o| o.name == name)
    }
}

/// One encoded row of the surrogate's training set.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSample {
    pub x: Vec<f64>,
    pub y: f64,
}

/// Importance of a single feature for one explained output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: Feature,
    pub score: f64,
}

/// Per-feature importances explaining one output slot, in input feature order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Saliency {
    pub output_name: String,
    pub per_feature_importance: Vec<FeatureImportance>,
}

impl Saliency {
    pub fn empty(output_name: impl Into<String>) -> Self {
        Saliency {
            output_name: output_name.into(),
            per_feature_importance: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.per_feature_importance.is_empty()
    }

    pub fn score_of(&self, feature_name: &str) -> Option<f64> {
        self.per_feature_importance
            .iter()
            .find(|fi| fi.feature.name() == feature_name)
            .map(|fi| fi.score)
    }

    /// The `n` features with the largest absolute importance, strongest first.
    pub fn top_features(&self, n: usize) -> Vec<&FeatureImportance> {
        let mut ranked: Vec<&FeatureImportance> = self.per_feature_importance.iter().collect();
        ranked.sort_by(|a, b| {
            b.score
                .abs()
                .partial_cmp(&a.score.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked.truncate(n);
        ranked
    }
}

impl fmt::Display for Saliency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Saliency for '{}':", self.output_name)?;
        if self.per_feature_importance.is_empty() {
            return writeln!(f, "  (no features)");
        }
        for fi in &self.per_feature_importance {
            writeln!(f, "  {:<20} {:>10.4}", fi.feature.name(), fi.score)?;
        }
        Ok(())
    }
}
