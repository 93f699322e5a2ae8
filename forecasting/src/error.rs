use market_data::{ArtifactError, ScalerError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("model expects a {expected_rows}x{expected_cols} window, got {rows}x{cols}")]
    Shape {
        expected_rows: usize,
        expected_cols: usize,
        rows: usize,
        cols: usize,
    },

    #[error("model produced no output")]
    EmptyOutput,

    #[error("model produced a non-finite prediction ({0})")]
    NonFinite(f64),

    #[error("inference runtime error: {0}")]
    Runtime(String),
}

#[derive(Error, Debug)]
pub enum ForecastError {
    #[error("observation window needs at least one row and one feature")]
    EmptyWindow,

    #[error("insufficient history: need at least {needed} observations, have {available}")]
    InsufficientData { needed: usize, available: usize },

    #[error("prediction failed at step {step}: {source}")]
    Inference {
        step: usize,
        #[source]
        source: ModelError,
    },

    #[error("rescaling failed: {0}")]
    Rescale(#[from] ScalerError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}
