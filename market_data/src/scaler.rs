use log::debug;
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use std::io::BufReader;
use std::path::Path;

use crate::dataset::open_artifact;
use crate::error::{ArtifactError, ArtifactKind, ScalerError};

fn default_feature_range() -> (f64, f64) {
    (0.0, 1.0)
}

/// A per-feature affine normalisation fitted offline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Scaler {
    MinMax {
        data_min: Vec<f64>,
        data_max: Vec<f64>,
        #[serde(default = "default_feature_range")]
        feature_range: (f64, f64),
    },
    Standard {
        mean: Vec<f64>,
        scale: Vec<f64>,
    },
}

impl Scaler {
    pub fn n_features(&self) -> usize {
        match self {
            Scaler::MinMax { data_min, .. } => data_min.len(),
            Scaler::Standard { mean, .. } => mean.len(),
        }
    }

    pub fn validate(&self) -> Result<(), ScalerError> {
        let (a, b) = match self {
            Scaler::MinMax { data_min, data_max, .. } => (data_min.len(), data_max.len()),
            Scaler::Standard { mean, scale } => (mean.len(), scale.len()),
        };
        if a != b {
            return Err(ScalerError::Parameters(format!("{} vs {}", a, b)));
        }
        if a == 0 {
            return Err(ScalerError::Parameters("no features".to_string()));
        }
        if let Scaler::MinMax { feature_range: (lo, hi), .. } = self {
            if lo >= hi {
                return Err(ScalerError::Parameters(format!(
                    "feature_range ({}, {}) is empty",
                    lo, hi
                )));
            }
        }
        Ok(())
    }

    /// `transformed = x * scale + offset`, per feature. Zero spreads count as 1.
    fn coefficients(&self) -> (Array1<f64>, Array1<f64>) {
        match self {
            Scaler::MinMax {
                data_min,
                data_max,
                feature_range: (lo, hi),
            } => {
                let scale: Array1<f64> = data_min
                    .iter()
                    .zip(data_max)
                    .map(|(min, max)| (hi - lo) / non_zero(max - min))
                    .collect();
                let offset = data_min
                    .iter()
                    .zip(scale.iter())
                    .map(|(min, s)| lo - min * s)
                    .collect();
                (scale, offset)
            }
            Scaler::Standard { mean, scale } => {
                let inv: Array1<f64> = scale.iter().map(|s| 1.0 / non_zero(*s)).collect();
                let offset = mean.iter().zip(inv.iter()).map(|(m, s)| -m * s).collect();
                (inv, offset)
            }
        }
    }

    fn check_width(&self, data: &Array2<f64>) -> Result<(), ScalerError> {
        if data.ncols() != self.n_features() {
            return Err(ScalerError::Width {
                expected: self.n_features(),
                actual: data.ncols(),
            });
        }
        Ok(())
    }

    pub fn transform(&self, data: &Array2<f64>) -> Result<Array2<f64>, ScalerError> {
        self.check_width(data)?;
        let (scale, offset) = self.coefficients();
        Ok(data * &scale.insert_axis(Axis(0)) + &offset.insert_axis(Axis(0)))
    }

    pub fn inverse_transform(&self, data: &Array2<f64>) -> Result<Array2<f64>, ScalerError> {
        self.check_width(data)?;
        let (scale, offset) = self.coefficients();
        Ok((data - &offset.insert_axis(Axis(0))) / &scale.insert_axis(Axis(0)))
    }
}

fn non_zero(spread: f64) -> f64 {
    if spread == 0.0 { 1.0 } else { spread }
}

/// Load a JSON scaler artifact.
pub fn load_scaler(path: &Path) -> Result<Scaler, ArtifactError> {
    let file = open_artifact(ArtifactKind::Scaler, path)?;
    let scaler: Scaler = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| ArtifactError::corrupt(ArtifactKind::Scaler, path, e))?;
    scaler
        .validate()
        .map_err(|e| ArtifactError::corrupt(ArtifactKind::Scaler, path, e))?;
    debug!(
        "Loaded scaler {} with {} features",
        path.display(),
        scaler.n_features()
    );
    Ok(scaler)
}
