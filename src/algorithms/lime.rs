// src/algorithms/lime.rs

use super::encoder::{DatasetEncoder, DEFAULT_NUMERIC_TOLERANCE};
use super::saliency::{ColumnAggregation, SaliencyAggregator};
use super::surrogate::{WeightedRidge, DEFAULT_REGULARIZATION};
use super::weighter::{ProximityWeighter, DEFAULT_KERNEL_WIDTH_FACTOR};
use crate::core::{LimeError, Output, PredictionInput, PredictionOutput, Result, Saliency};
use crate::observe::{ExplanationEvent, ExplanationObserver, NoopObserver};
use crate::traits::{PerturbationGenerator, PredictModel};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// How composite (nested) features enter the surrogate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositeEncoding {
    /// Replace every composite by its leaf features, each explained on its own
    /// under its dotted path (`address.city`).
    #[default]
    Flatten,
    /// Keep the composite as one feature, compared by value equality.
    Opaque,
}

/// Configuration for the LIME explainer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimeConfig {
    /// Perturbations requested from the generator by [`LimeExplainer::explain_model`].
    pub n_samples: usize,
    pub kernel_width_factor: f64,
    pub numeric_tolerance: f64,
    pub regularization: f64,
    pub fit_intercept: bool,
    pub column_aggregation: ColumnAggregation,
    pub composite_encoding: CompositeEncoding,
}

impl Default for LimeConfig {
    fn default() -> Self {
        LimeConfig {
            n_samples: 300,
            kernel_width_factor: DEFAULT_KERNEL_WIDTH_FACTOR,
            numeric_tolerance: DEFAULT_NUMERIC_TOLERANCE,
            regularization: DEFAULT_REGULARIZATION,
            fit_intercept: true,
            column_aggregation: ColumnAggregation::default(),
            composite_encoding: CompositeEncoding::default(),
        }
    }
}

impl LimeConfig {
    /// Parses a JSON config. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: LimeConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.kernel_width_factor.is_finite() && self.kernel_width_factor > 0.0) {
            return Err(LimeError::InvalidConfig(format!(
                "kernel_width_factor must be positive, got {}",
                self.kernel_width_factor
            )));
        }
        if !(self.numeric_tolerance.is_finite() && self.numeric_tolerance > 0.0) {
            return Err(LimeError::InvalidConfig(format!(
                "numeric_tolerance must be positive, got {}",
                self.numeric_tolerance
            )));
        }
        if !(self.regularization.is_finite() && self.regularization >= 0.0) {
            return Err(LimeError::InvalidConfig(format!(
                "regularization must be non-negative, got {}",
                self.regularization
            )));
        }
        Ok(())
    }
}

/// Explains single predictions of a black-box model with a locally fitted,
/// proximity-weighted linear surrogate.
///
/// The explainer holds no per-request state and can be shared across threads.
pub struct LimeExplainer {
    config: LimeConfig,
    observer: Arc<dyn ExplanationObserver>,
}

impl fmt::Debug for LimeExplainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LimeExplainer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl LimeExplainer {
    pub fn new(config: Option<LimeConfig>) -> Result<Self> {
        let resolved_config = config.unwrap_or_default();
        resolved_config.validate()?;
        Ok(LimeExplainer {
            config: resolved_config,
            observer: Arc::new(NoopObserver),
        })
    }

    pub fn with_observer(mut self, observer: Arc<dyn ExplanationObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> &LimeConfig {
        &self.config
    }

    /// Explains `target_output` for `target` from already-collected
    /// perturbations and their outputs (index-aligned).
    ///
    /// Perturbations that do not share the target's feature layout are
    /// rejected. A missing target output, a target without features or an
    /// empty perturbation set give an empty saliency.
    pub fn explain(
        &self,
        target: &PredictionInput,
        target_output: Option<&Output>,
        perturbed_inputs: &[PredictionInput],
        perturbed_outputs: &[Output],
    ) -> Result<Saliency> {
        let output_name = target_output.map(|o| o.name.as_str()).unwrap_or_default();
        if perturbed_inputs.len() != perturbed_outputs.len() {
            return Err(LimeError::ShapeMismatch(format!(
                "{} perturbed inputs but {} perturbed outputs",
                perturbed_inputs.len(),
                perturbed_outputs.len()
            )));
        }

        let (target, perturbed_inputs) = self.prepare_inputs(target, perturbed_inputs);

        let encoded = DatasetEncoder::new(&perturbed_inputs, perturbed_outputs, &target, target_output)
            .with_numeric_tolerance(self.config.numeric_tolerance)
            .encode()?;

        let skip_reason = match target_output {
            None => Some("missing target output"),
            Some(_) if target.is_empty() => Some("target input has no features"),
            Some(_) if encoded.is_empty() => Some("no perturbations"),
            Some(_) => None,
        };
        if let Some(reason) = skip_reason {
            self.observer.on_event(&ExplanationEvent::Skipped {
                output_name: output_name.to_owned(),
                reason: reason.to_owned(),
            });
            return Ok(Saliency::empty(output_name));
        }
        self.observer.on_event(&ExplanationEvent::Encoded {
            output_name: output_name.to_owned(),
            rows: encoded.n_rows(),
            columns: encoded.n_columns(),
        });

        let weights = ProximityWeighter::new(self.config.kernel_width_factor).weights(target.len(), &encoded.x);
        self.observer.on_event(&ExplanationEvent::Weighted {
            output_name: output_name.to_owned(),
            min_weight: weights.iter().copied().fold(f64::INFINITY, f64::min),
            max_weight: weights.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        });

        let fit = WeightedRidge::new(self.config.regularization, self.config.fit_intercept).fit(
            encoded.x.view(),
            encoded.y.view(),
            weights.view(),
        )?;
        self.observer.on_event(&ExplanationEvent::Fitted {
            output_name: output_name.to_owned(),
            intercept: fit.intercept,
            weighted_r2: fit.weighted_r2,
            regularization: fit.regularization,
            degraded: fit.degraded,
        });

        SaliencyAggregator::new(self.config.column_aggregation).aggregate(
            output_name,
            target.features(),
            &encoded.columns,
            &fit.coefficients,
        )
    }

    /// Explains every output slot of `target_prediction`, matching slots in
    /// the perturbed predictions by name. Returns one saliency per slot, in
    /// slot order.
    pub fn explain_prediction(
        &self,
        target: &PredictionInput,
        target_prediction: &PredictionOutput,
        perturbed_inputs: &[PredictionInput],
        perturbed_predictions: &[PredictionOutput],
    ) -> Result<Vec<Saliency>> {
        if perturbed_inputs.len() != perturbed_predictions.len() {
            return Err(LimeError::ShapeMismatch(format!(
                "{} perturbed inputs but {} perturbed predictions",
                perturbed_inputs.len(),
                perturbed_predictions.len()
            )));
        }
        target_prediction
            .outputs
            .iter()
            .map(|target_output| {
                let perturbed_outputs = perturbed_predictions
                    .iter()
                    .enumerate()
                    .map(|(i, prediction)| {
                        prediction.by_name(&target_output.name).cloned().ok_or_else(|| {
                            LimeError::ShapeMismatch(format!(
                                "perturbed prediction {} has no output '{}'",
                                i, target_output.name
                            ))
                        })
                    })
                    .collect::<Result<Vec<Output>>>()?;
                self.explain(target, Some(target_output), perturbed_inputs, &perturbed_outputs)
            })
            .collect()
    }

    /// Full loop: perturb `target`, query `model` on the target and the
    /// perturbations, then explain every output slot.
    pub fn explain_model<M, G>(&self, model: &M, generator: &G, target: &PredictionInput) -> Result<Vec<Saliency>>
    where
        M: PredictModel + ?Sized,
        G: PerturbationGenerator + ?Sized,
    {
        let target_prediction = model
            .predict(std::slice::from_ref(target))?
            .into_iter()
            .next()
            .ok_or_else(|| LimeError::ModelPrediction("model returned no prediction for the target".to_string()))?;

        let perturbed_inputs = generator.perturb(target, self.config.n_samples)?;
        let perturbed_predictions = model.predict(&perturbed_inputs)?;
        if perturbed_predictions.len() != perturbed_inputs.len() {
            return Err(LimeError::ModelPrediction(format!(
                "model returned {} predictions for {} inputs",
                perturbed_predictions.len(),
                perturbed_inputs.len()
            )));
        }

        self.explain_prediction(target, &target_prediction, &perturbed_inputs, &perturbed_predictions)
    }

    fn prepare_inputs<'a>(
        &self,
        target: &'a PredictionInput,
        perturbed_inputs: &'a [PredictionInput],
    ) -> (Cow<'a, PredictionInput>, Cow<'a, [PredictionInput]>) {
        match self.config.composite_encoding {
            CompositeEncoding::Opaque => (Cow::Borrowed(target), Cow::Borrowed(perturbed_inputs)),
            CompositeEncoding::Flatten => (
                Cow::Owned(target.linearized()),
                Cow::Owned(perturbed_inputs.iter().map(PredictionInput::linearized).collect()),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Feature, FeatureType, Value};
    use crate::observe::tests::RecordingObserver;
    use approx::assert_relative_eq;

    fn label(value: &str) -> Output {
        Output::new("decision", FeatureType::Categorical, Value::Categorical(value.into()), 0.9)
    }

    fn applicant(income: f64, owner: bool, job: &str) -> PredictionInput {
        PredictionInput::new(vec![
            Feature::number("income", income),
            Feature::boolean("owner", owner),
            Feature::categorical("job", job),
        ])
    }

    // approves whenever the applicant owns a home
    fn owner_model(input: &PredictionInput) -> Output {
        match input.features()[1].value() {
            Value::Boolean(true) => label("approve"),
            _ => label("reject"),
        }
    }

    fn perturbations() -> Vec<PredictionInput> {
        let mut inputs = Vec::new();
        for &income in &[20.0, 50.0, 80.0] {
            for &owner in &[true, false] {
                for job in ["clerk", "nurse"] {
                    inputs.push(applicant(income, owner, job));
                }
            }
        }
        inputs
    }

    #[test]
    fn driving_feature_gets_the_largest_importance() -> Result<()> {
        let target = applicant(50.0, true, "clerk");
        let inputs = perturbations();
        let outputs: Vec<Output> = inputs.iter().map(owner_model).collect();

        let saliency = LimeExplainer::new(None)?.explain(&target, Some(&label("approve")), &inputs, &outputs)?;
        println!("{}", saliency);

        assert_eq!(saliency.per_feature_importance.len(), 3);
        assert_eq!(saliency.top_features(1)[0].feature.name(), "owner");
        let owner = saliency.score_of("owner").unwrap_or_default();
        assert!(owner > 0.9, "owner importance was {}", owner);
        assert!(saliency.score_of("job").unwrap_or_default().abs() < 0.05);
        Ok(())
    }

    #[test]
    fn explanation_is_deterministic() -> Result<()> {
        let explainer = LimeExplainer::new(None)?;
        let target = applicant(50.0, true, "clerk");
        let inputs = perturbations();
        let outputs: Vec<Output> = inputs.iter().map(owner_model).collect();
        let first = explainer.explain(&target, Some(&label("approve")), &inputs, &outputs)?;
        let second = explainer.explain(&target, Some(&label("approve")), &inputs, &outputs)?;
        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn empty_cases_give_empty_saliency() -> Result<()> {
        let explainer = LimeExplainer::new(None)?;
        let target = applicant(50.0, true, "clerk");
        assert!(explainer.explain(&target, Some(&label("approve")), &[], &[])?.is_empty());

        let inputs = perturbations();
        let outputs: Vec<Output> = inputs.iter().map(owner_model).collect();
        assert!(explainer.explain(&target, None, &inputs, &outputs)?.is_empty());
        Ok(())
    }

    #[test]
    fn misaligned_inputs_and_outputs_fail() -> Result<()> {
        let explainer = LimeExplainer::new(None)?;
        let target = applicant(50.0, true, "clerk");
        let inputs = perturbations();
        let err = explainer
            .explain(&target, Some(&label("approve")), &inputs, &[label("approve")])
            .unwrap_err();
        assert!(matches!(err, LimeError::ShapeMismatch(_)));
        Ok(())
    }

    #[test]
    fn single_perturbation_is_well_formed() -> Result<()> {
        let target = applicant(50.0, true, "clerk");
        let inputs = vec![applicant(20.0, false, "nurse")];
        let outputs = vec![label("reject")];
        let saliency = LimeExplainer::new(None)?.explain(&target, Some(&label("approve")), &inputs, &outputs)?;
        assert_eq!(saliency.per_feature_importance.len(), 3);
        assert!(saliency.per_feature_importance.iter().all(|fi| fi.score == 0.0));
        Ok(())
    }

    #[test]
    fn composites_flatten_or_stay_opaque() -> Result<()> {
        let make = |city: &str, zip: &str| {
            PredictionInput::new(vec![Feature::composite(
                "address",
                vec![Feature::categorical("city", city), Feature::categorical("zip", zip)],
            )])
        };
        let target = make("Rome", "00100");
        let inputs = vec![make("Rome", "00100"), make("Milan", "00100"), make("Rome", "20100")];
        let outputs = vec![label("approve"), label("reject"), label("approve")];

        let flat = LimeExplainer::new(None)?.explain(&target, Some(&label("approve")), &inputs, &outputs)?;
        let names: Vec<&str> = flat.per_feature_importance.iter().map(|fi| fi.feature.name()).collect();
        assert_eq!(names, vec!["address.city", "address.zip"]);
        assert!(flat.score_of("address.city").unwrap_or_default() > flat.score_of("address.zip").unwrap_or_default());

        let opaque_config = LimeConfig {
            composite_encoding: CompositeEncoding::Opaque,
            ..LimeConfig::default()
        };
        let opaque = LimeExplainer::new(Some(opaque_config))?.explain(&target, Some(&label("approve")), &inputs, &outputs)?;
        assert_eq!(opaque.per_feature_importance.len(), 1);
        assert_eq!(opaque.per_feature_importance[0].feature.name(), "address");
        Ok(())
    }

    #[test]
    fn composites_sharing_a_leaf_name_are_explained_separately() -> Result<()> {
        let make = |home: &str, work: &str| {
            PredictionInput::new(vec![
                Feature::composite("home", vec![Feature::text("street", home)]),
                Feature::composite("work", vec![Feature::text("street", work)]),
            ])
        };
        let target = make("a b", "c d");
        let inputs = vec![make("a b", "c d"), make("a b", "c"), make("a", "d")];
        // approves whenever the work street still mentions "d"
        let outputs = vec![label("approve"), label("reject"), label("approve")];

        let saliency = LimeExplainer::new(None)?.explain(&target, Some(&label("approve")), &inputs, &outputs)?;
        println!("{}", saliency);
        let names: Vec<&str> = saliency.per_feature_importance.iter().map(|fi| fi.feature.name()).collect();
        assert_eq!(names, vec!["home.street", "work.street"]);
        let work = saliency.score_of("work.street").unwrap_or_default();
        let home = saliency.score_of("home.street").unwrap_or_default();
        assert!(work > 0.5, "work.street importance was {}", work);
        assert!(home.abs() < 0.1, "home.street importance was {}", home);
        Ok(())
    }

    #[test]
    fn foreign_layout_is_rejected_without_a_target_output() -> Result<()> {
        let explainer = LimeExplainer::new(None)?;
        let target = applicant(50.0, true, "clerk");
        let foreign = vec![PredictionInput::new(vec![Feature::categorical("zzz", "q")])];
        let err = explainer.explain(&target, None, &foreign, &[label("approve")]).unwrap_err();
        assert!(matches!(err, LimeError::ShapeMismatch(_)));
        Ok(())
    }

    #[test]
    fn observer_sees_pipeline_stages() -> Result<()> {
        let observer = Arc::new(RecordingObserver::default());
        let explainer = LimeExplainer::new(None)?.with_observer(observer.clone());
        let target = applicant(50.0, true, "clerk");
        let inputs = perturbations();
        let outputs: Vec<Output> = inputs.iter().map(owner_model).collect();
        explainer.explain(&target, Some(&label("approve")), &inputs, &outputs)?;
        explainer.explain(&target, Some(&label("approve")), &[], &[])?;

        let events = observer.events.lock().unwrap();
        assert_eq!(events.len(), 4);
        assert!(matches!(events[0], ExplanationEvent::Encoded { rows: 12, columns: 3, .. }));
        match &events[1] {
            ExplanationEvent::Weighted { max_weight, .. } => assert_relative_eq!(*max_weight, 1.0),
            other => panic!("unexpected event {:?}", other),
        }
        assert!(matches!(events[2], ExplanationEvent::Fitted { degraded: false, .. }));
        assert!(matches!(events[3], ExplanationEvent::Skipped { .. }));
        Ok(())
    }

    #[test]
    fn config_defaults_and_validation() -> Result<()> {
        let config = LimeConfig::from_json_str(r#"{ "n_samples": 50, "column_aggregation": "max_magnitude" }"#)?;
        assert_eq!(config.n_samples, 50);
        assert_eq!(config.column_aggregation, ColumnAggregation::MaxMagnitude);
        assert_eq!(config.kernel_width_factor, 0.75);
        assert_eq!(config.composite_encoding, CompositeEncoding::Flatten);

        assert!(matches!(
            LimeConfig::from_json_str(r#"{ "kernel_width_factor": 0.0 }"#),
            Err(LimeError::InvalidConfig(_))
        ));
        assert!(matches!(LimeConfig::from_json_str("not json"), Err(LimeError::Config(_))));
        assert!(LimeExplainer::new(Some(LimeConfig {
            regularization: -1.0,
            ..LimeConfig::default()
        }))
        .is_err());
        Ok(())
    }
}
