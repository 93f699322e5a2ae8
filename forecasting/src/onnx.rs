use market_data::dataset::open_artifact;
use market_data::{ArtifactError, ArtifactKind};
use onnxruntime::environment::Environment;
use onnxruntime::ndarray::Array3;
use onnxruntime::session::Session;
use onnxruntime::tensor::OrtOwnedTensor;
use onnxruntime::{GraphOptimizationLevel, LoggingLevel};
use std::path::Path;

use crate::error::ModelError;
use crate::model::Predictor;
use crate::window::Window;

pub struct OnnxModel<'a> {
    session: Session<'a>,
}

/// Runs `f` against an ONNX session. The session borrows the runtime
/// environment, so both live only for this call.
pub fn with_onnx_model<R>(
    path: &Path,
    f: impl FnOnce(&mut dyn Predictor) -> R,
) -> Result<R, ArtifactError> {
    open_artifact(ArtifactKind::Model, path)?;
    let corrupt = |e: onnxruntime::OrtError| ArtifactError::corrupt(ArtifactKind::Model, path, e);

    let environment = Environment::builder()
        .with_name("forecast_inference")
        .with_log_level(LoggingLevel::Warning)
        .build()
        .map_err(corrupt)?;

    let session = environment
        .new_session_builder()
        .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Basic))
        .and_then(|b| b.with_number_threads(1))
        .and_then(|b| b.with_model_from_file(path))
        .map_err(corrupt)?;

    let mut model = OnnxModel { session };
    Ok(f(&mut model))
}

impl Predictor for OnnxModel<'_> {
    fn predict(&mut self, window: &Window) -> Result<f64, ModelError> {
        let values: Vec<f32> = window.rows().iter().map(|v| *v as f32).collect();
        let input = Array3::from_shape_vec((1, window.len(), window.width()), values)
            .map_err(|e| ModelError::Runtime(e.to_string()))?;

        let outputs: Vec<OrtOwnedTensor<f32, _>> = self
            .session
            .run(vec![input])
            .map_err(|e| ModelError::Runtime(e.to_string()))?;

        let value = outputs
            .first()
            .and_then(|tensor| tensor.iter().next().copied())
            .ok_or(ModelError::EmptyOutput)?;
        Ok(f64::from(value))
    }
}
