// src/observe.rs

//! Optional observability hook for the explanation pipeline.
//!
//! The pipeline reports what it did through an [`ExplanationObserver`]. The
//! default observer does nothing; [`TracingObserver`] forwards events to
//! `tracing`. Observers only watch, they cannot alter the computation.

/// A structured event emitted by the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum ExplanationEvent {
    /// The perturbations were encoded into a design matrix.
    Encoded {
        output_name: String,
        rows: usize,
        columns: usize,
    },
    /// Proximity weights were computed.
    Weighted {
        output_name: String,
        min_weight: f64,
        max_weight: f64,
    },
    /// The surrogate was fitted.
    Fitted {
        output_name: String,
        intercept: f64,
        weighted_r2: f64,
        regularization: f64,
        degraded: bool,
    },
    /// The explanation was skipped and an empty saliency returned.
    Skipped { output_name: String, reason: String },
}

pub trait ExplanationObserver: Send + Sync {
    fn on_event(&self, _event: &ExplanationEvent) {}
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ExplanationObserver for NoopObserver {}

/// Emits every event as a `tracing` event under the `lime_rs` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl ExplanationObserver for TracingObserver {
    fn on_event(&self, event: &ExplanationEvent) {
        match event {
            ExplanationEvent::Encoded {
                output_name,
                rows,
                columns,
            } => {
                tracing::debug!(target: "lime_rs", output = %output_name, rows, columns, "Encoded perturbations");
            }
            ExplanationEvent::Weighted {
                output_name,
                min_weight,
                max_weight,
            } => {
                tracing::trace!(target: "lime_rs", output = %output_name, min_weight, max_weight, "Computed proximity weights");
            }
            ExplanationEvent::Fitted {
                output_name,
                intercept,
                weighted_r2,
                regularization,
                degraded,
            } => {
                if *degraded {
                    tracing::warn!(target: "lime_rs", output = %output_name, regularization, "Surrogate fit degraded to zero coefficients");
                } else {
                    tracing::debug!(target: "lime_rs", output = %output_name, intercept, weighted_r2, regularization, "Fitted surrogate");
                }
            }
            ExplanationEvent::Skipped {
                output_name,
                reason,
            } => {
                tracing::debug!(target: "lime_rs", output = %output_name, reason = %reason, "Skipped explanation");
            }
        }
    }
}
