// src/lib.rs

//! `lime_rs` explains single predictions of black-box models with LIME-style
//! local surrogates.
//!
//! Given the input being explained, the model's output for it, and a batch of
//! perturbed inputs with the model's outputs for them, the pipeline
//!
//! 1. encodes the perturbations into a numeric design matrix
//!    ([`algorithms::DatasetEncoder`]),
//! 2. weighs every sample by proximity to the explained input
//!    ([`algorithms::ProximityWeighter`]),
//! 3. fits a weighted ridge surrogate ([`algorithms::WeightedRidge`]),
//! 4. folds the coefficients back onto the input features
//!    ([`algorithms::SaliencyAggregator`]).
//!
//! ```
//! use lime_rs::{Feature, FeatureType, LimeExplainer, Output, PredictionInput, Value};
//!
//! let target = PredictionInput::new(vec![
//!     Feature::number("age", 30.0),
//!     Feature::boolean("approved", true),
//! ]);
//! let perturbed: Vec<PredictionInput> = [(10.0, true), (30.0, false), (30.0, true)]
//!     .iter()
//!     .map(|&(age, approved)| {
//!         PredictionInput::new(vec![Feature::number("age", age), Feature::boolean("approved", approved)])
//!     })
//!     .collect();
//! let score = |v: f64| Output::new("score", FeatureType::Number, Value::Number(v), 1.0);
//! let outputs = vec![score(0.4), score(0.2), score(0.9)];
//!
//! let explainer = LimeExplainer::new(None)?;
//! let saliency = explainer.explain(&target, Some(&score(0.9)), &perturbed, &outputs)?;
//! assert_eq!(saliency.per_feature_importance.len(), 2);
//! # Ok::<(), lime_rs::LimeError>(())
//! ```

pub mod algorithms;
pub mod core;
pub mod observe;
pub mod traits;
pub mod utils;

// Re-export key components for easier use by library consumers
pub use crate::algorithms::{ColumnAggregation, CompositeEncoding, LimeConfig, LimeExplainer};
pub use crate::core::{
    Feature, FeatureImportance, FeatureType, LimeError, Output, PredictionInput, PredictionOutput,
    Result, Saliency, TrainingSample, Value,
};
pub use crate::observe::{ExplanationEvent, ExplanationObserver, NoopObserver, TracingObserver};
pub use crate::traits::{PerturbationGenerator, PredictModel};
