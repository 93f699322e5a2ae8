use log::debug;
use market_data::dataset::open_artifact;
use market_data::{ArtifactError, ArtifactKind};
use serde::{Deserialize, Serialize};
use std::io::BufReader;
use std::path::Path;

use crate::error::ModelError;
use crate::window::Window;

/// Maps a (W x F) window to the next value of feature 0, in scaled space.
///
/// Implementations must be deterministic for identical input.
pub trait Predictor {
    fn predict(&mut self, window: &Window) -> Result<f64, ModelError>;
}

/// Adapts a closure into a [`Predictor`].
pub struct FnPredictor<F>(pub F);

impl<F> Predictor for FnPredictor<F>
where
    F: FnMut(&Window) -> Result<f64, ModelError>,
{
    fn predict(&mut self, window: &Window) -> Result<f64, ModelError> {
        (self.0)(window)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    Linear,
    Onnx,
}

impl ModelKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Some(ModelKind::Linear),
            Some("onnx") => Some(ModelKind::Onnx),
            _ => None,
        }
    }
}

/// Weighted sum over every cell of the window plus a bias.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearWindowModel {
    /// One row of per-feature weights for each window position, oldest first.
    pub weights: Vec<Vec<f64>>,
    #[serde(default)]
    pub bias: f64,
}

impl LinearWindowModel {
    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        let file = open_artifact(ArtifactKind::Model, path)?;
        let model: LinearWindowModel = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| ArtifactError::corrupt(ArtifactKind::Model, path, e))?;

        let width = model.weights.first().map(Vec::len).unwrap_or(0);
        if width == 0 || model.weights.iter().any(|row| row.len() != width) {
            return Err(ArtifactError::corrupt(
                ArtifactKind::Model,
                path,
                "weights must be a non-empty rectangular matrix",
            ));
        }
        Ok(model)
    }

    pub fn window_len(&self) -> usize {
        self.weights.len()
    }

    pub fn n_features(&self) -> usize {
        self.weights.first().map(Vec::len).unwrap_or(0)
    }
}

impl Predictor for LinearWindowModel {
    fn predict(&mut self, window: &Window) -> Result<f64, ModelError> {
        if window.len() != self.window_len() || window.width() != self.n_features() {
            return Err(ModelError::Shape {
                expected_rows: self.window_len(),
                expected_cols: self.n_features(),
                rows: window.len(),
                cols: window.width(),
            });
        }

        let rows = window.rows();
        let mut acc = self.bias;
        for (i, weights) in self.weights.iter().enumerate() {
            for (j, w) in weights.iter().enumerate() {
                acc += w * rows[[i, j]];
            }
        }
        Ok(acc)
    }
}

/// Loads the model at `path` and hands it to `f` for the duration of the call.
///
/// The backend is picked from the file extension: `.json` for
/// [`LinearWindowModel`], `.onnx` for an ONNX graph (needs the `onnx` feature).
pub fn with_model<R>(
    path: &Path,
    f: impl FnOnce(&mut dyn Predictor) -> R,
) -> Result<R, ArtifactError> {
    let Some(kind) = ModelKind::from_path(path) else {
        return Err(ArtifactError::corrupt(
            ArtifactKind::Model,
            path,
            "unsupported model format",
        ));
    };
    debug!("Loading {:?} model from {}", kind, path.display());

    match kind {
        ModelKind::Linear => {
            let mut model = LinearWindowModel::load(path)?;
            Ok(f(&mut model))
        }
        ModelKind::Onnx => load_onnx(path, f),
    }
}

#[cfg(feature = "onnx")]
fn load_onnx<R>(path: &Path, f: impl FnOnce(&mut dyn Predictor) -> R) -> Result<R, ArtifactError> {
    crate::onnx::with_onnx_model(path, f)
}

#[cfg(not(feature = "onnx"))]
fn load_onnx<R>(path: &Path, _f: impl FnOnce(&mut dyn Predictor) -> R) -> Result<R, ArtifactError> {
    // surface a missing file before the feature complaint
    open_artifact(ArtifactKind::Model, path)?;
    Err(ArtifactError::corrupt(
        ArtifactKind::Model,
        path,
        "ONNX models need the `onnx` feature",
    ))
}

/// Builds a model whose weights all sit on the newest row's feature 0,
/// i.e. a persistence forecast scaled by `gain`. Test fixture.
#[cfg(any(test, feature = "test-util"))]
pub fn persistence_model(window_len: usize, n_features: usize, gain: f64) -> LinearWindowModel {
    let mut weights = ndarray::Array2::<f64>::zeros((window_len, n_features));
    if window_len > 0 && n_features > 0 {
        weights[[window_len - 1, 0]] = gain;
    }
    LinearWindowModel {
        weights: weights.outer_iter().map(|row| row.to_vec()).collect(),
        bias: 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn linear_model_is_weighted_sum_plus_bias() {
        let mut model = LinearWindowModel {
            weights: vec![vec![0.5, 1.0], vec![2.0, 0.0]],
            bias: 0.25,
        };
        let window = Window::new(array![[1.0, 2.0], [3.0, 4.0]]).unwrap();
        // 0.5*1 + 1*2 + 2*3 + 0*4 + 0.25
        assert_eq!(model.predict(&window).unwrap(), 8.75);
    }

    #[test]
    fn linear_model_rejects_wrong_shape() {
        let mut model = persistence_model(3, 1, 1.0);
        let window = Window::new(array![[1.0], [2.0]]).unwrap();
        assert!(matches!(
            model.predict(&window),
            Err(ModelError::Shape { expected_rows: 3, rows: 2, .. })
        ));
    }

    #[test]
    fn persistence_model_repeats_last_value() {
        let mut model = persistence_model(3, 2, 1.0);
        let window = Window::new(array![[1.0, 9.0], [2.0, 9.0], [3.0, 9.0]]).unwrap();
        assert_eq!(model.predict(&window).unwrap(), 3.0);
    }

    #[test]
    fn kind_follows_extension() {
        assert_eq!(ModelKind::from_path(Path::new("m/adani.json")), Some(ModelKind::Linear));
        assert_eq!(ModelKind::from_path(Path::new("m/sony.onnx")), Some(ModelKind::Onnx));
        assert_eq!(ModelKind::from_path(Path::new("m/tcs_model.h5")), None);
    }

    #[test]
    fn with_model_loads_json_model() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.json");
        fs::write(&path, r#"{"weights": [[0.0], [1.0]], "bias": 0.5}"#).unwrap();

        let window = Window::new(array![[4.0], [2.0]]).unwrap();
        let out = with_model(&path, |model| model.predict(&window)).unwrap().unwrap();
        assert_eq!(out, 2.5);
    }

    #[test]
    fn missing_model_is_attributed_to_model() {
        let dir = TempDir::new().unwrap();
        for name in ["model.json", "model.onnx"] {
            let err = with_model(&dir.path().join(name), |_| ()).unwrap_err();
            assert!(matches!(
                err,
                ArtifactError::Missing { kind: ArtifactKind::Model, .. }
            ));
        }
    }

    #[test]
    fn ragged_weights_are_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.json");
        fs::write(&path, r#"{"weights": [[0.0, 1.0], [1.0]]}"#).unwrap();

        let err = with_model(&path, |_| ()).unwrap_err();
        assert!(matches!(
            err,
            ArtifactError::Corrupt { kind: ArtifactKind::Model, .. }
        ));
    }

    #[test]
    fn unknown_extension_is_corrupt_model() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.h5");
        fs::write(&path, b"HDF").unwrap();

        let err = with_model(&path, |_| ()).unwrap_err();
        assert_eq!(err.kind(), ArtifactKind::Model);
        assert!(err.to_string().contains("unsupported model format"));
    }
}
