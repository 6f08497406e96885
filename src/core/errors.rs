// src/core/errors.rs
use thiserror::Error;

/// Failures surfaced by the explanation pipeline.
///
/// Degenerate-but-expected situations (empty perturbation sets, zero-variance
/// numeric columns, rank-deficient surrogate fits) are absorbed with fallback
/// values and never show up here. Only precondition violations and
/// collaborator failures do.
#[derive(Debug, Error)]
pub enum LimeError {
    #[error("Shape Mismatch: {0}")]
    ShapeMismatch(String),

    #[error("Invalid Value: {0}")]
    InvalidValue(String),

    #[error("Invalid Config: {0}")]
    InvalidConfig(String),

    #[error("Model Prediction Error: {0}")]
    ModelPrediction(String),

    #[error("Perturbation Error: {0}")]
    Perturbation(String),

    #[error("Config Parse Error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Ndarray Error: {0}")]
    Ndarray(#[from] ndarray::ShapeError),
}

// Convenience type alias for Result
pub type Result<T> = std::result::Result<T, LimeError>;
