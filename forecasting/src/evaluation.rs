//! One-step-ahead RMSE of each company's model over its own history.

use log::{error, info, warn};
use market_data::dataset::{load_dataset, open_artifact};
use market_data::scaler::load_scaler;
use market_data::{ArtifactError, ArtifactKind, CompanyArtifacts, CompanyRegistry};
use ndarray::{Array2, s};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::io::BufReader;
use std::path::Path;

use crate::error::ForecastError;
use crate::model::{Predictor, with_model};
use crate::rescale::rescale;
use crate::window::Window;

/// Company name -> RMSE in price units.
pub type Metrics = BTreeMap<String, f64>;

/// Predicts every observation from the `window_size` rows before it.
/// Returns `(predictions, targets)` in scaled space.
pub fn one_step_predictions<P: Predictor + ?Sized>(
    predictor: &mut P,
    data: &Array2<f64>,
    window_size: usize,
) -> Result<(Vec<f64>, Vec<f64>), ForecastError> {
    if window_size == 0 {
        return Err(ForecastError::EmptyWindow);
    }
    let available = data.nrows();
    if available <= window_size {
        return Err(ForecastError::InsufficientData {
            needed: window_size + 1,
            available,
        });
    }

    let mut predictions = Vec::with_capacity(available - window_size);
    let mut targets = Vec::with_capacity(available - window_size);
    for i in window_size..available {
        let window = Window::new(data.slice(s![i - window_size..i, ..]).to_owned())?;
        let prediction = predictor
            .predict(&window)
            .map_err(|source| ForecastError::Inference {
                step: i - window_size + 1,
                source,
            })?;
        predictions.push(prediction);
        targets.push(data[[i, 0]]);
    }
    Ok((predictions, targets))
}

pub fn rmse(predicted: &[f64], actual: &[f64]) -> Option<f64> {
    if predicted.is_empty() || predicted.len() != actual.len() {
        return None;
    }
    let sum: f64 = predicted
        .iter()
        .zip(actual)
        .map(|(p, a)| (p - a).powi(2))
        .sum();
    Some((sum / predicted.len() as f64).sqrt())
}

pub fn evaluate_company(company: &CompanyArtifacts, window_size: usize) -> Result<f64, ForecastError> {
    let scaler = load_scaler(&company.scaler)?;
    let data = load_dataset(&company.dataset)?;
    let (predictions, targets) =
        with_model(&company.model, |model| one_step_predictions(model, &data, window_size))??;

    let width = data.ncols();
    let predictions = rescale(&scaler, &predictions, width)?;
    let targets = rescale(&scaler, &targets, width)?;

    rmse(&predictions, &targets).ok_or(ForecastError::InsufficientData {
        needed: window_size + 1,
        available: data.nrows(),
    })
}

/// Evaluates all companies in parallel. Companies without a model file are
/// skipped with a warning; other failures are logged and skipped.
pub fn evaluate_all(registry: &CompanyRegistry, window_size: usize) -> Metrics {
    let companies: Vec<&CompanyArtifacts> = registry.iter().collect();

    companies
        .par_iter()
        .filter_map(|company| {
            if !company.model.exists() {
                warn!("Model file not found for {}: {}", company.name, company.model.display());
                return None;
            }
            info!("Computing RMSE for {}...", company.name);
            match evaluate_company(company, window_size) {
                Ok(value) => Some((company.name.clone(), value)),
                Err(e) => {
                    error!("Evaluation failed for {}: {}", company.name, e);
                    None
                }
            }
        })
        .collect()
}

pub fn write_metrics(path: &Path, metrics: &Metrics) -> Result<(), ArtifactError> {
    let json = serde_json::to_string_pretty(metrics)
        .map_err(|e| ArtifactError::corrupt(ArtifactKind::Metrics, path, e))?;
    std::fs::write(path, json).map_err(|source| ArtifactError::Io {
        kind: ArtifactKind::Metrics,
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_metrics(path: &Path) -> Result<Metrics, ArtifactError> {
    let file = open_artifact(ArtifactKind::Metrics, path)?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| ArtifactError::corrupt(ArtifactKind::Metrics, path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FnPredictor, persistence_model};
    use market_data::AppConfig;
    use ndarray::array;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn one_step_walks_every_window() {
        let data = array![[1.0], [2.0], [3.0], [4.0], [5.0]];
        let mut model = persistence_model(2, 1, 1.0);
        let (preds, targets) = one_step_predictions(&mut model, &data, 2).unwrap();
        assert_eq!(preds, vec![2.0, 3.0, 4.0]);
        assert_eq!(targets, vec![3.0, 4.0, 5.0]);
    }

    #[test]
    fn one_step_needs_more_rows_than_window() {
        let data = array![[1.0], [2.0]];
        let mut stub = FnPredictor(|_: &Window| Ok(0.0));
        assert!(matches!(
            one_step_predictions(&mut stub, &data, 2),
            Err(ForecastError::InsufficientData { needed: 3, available: 2 })
        ));
    }

    #[test]
    fn rmse_of_known_errors() {
        assert_eq!(rmse(&[1.0, 2.0], &[1.0, 2.0]), Some(0.0));
        assert_eq!(rmse(&[3.0, 0.0], &[0.0, 4.0]), Some((12.5f64).sqrt()));
        assert_eq!(rmse(&[], &[]), None);
        assert_eq!(rmse(&[1.0], &[1.0, 2.0]), None);
    }

    fn write_company(dir: &Path, name: &str) {
        let model = persistence_model(2, 2, 1.0);
        fs::write(dir.join(format!("{name}.json")), serde_json::to_string(&model).unwrap()).unwrap();
        fs::write(
            dir.join(format!("{name}_scaler.json")),
            r#"{"kind":"min_max","data_min":[100.0,0.0],"data_max":[200.0,1.0]}"#,
        )
        .unwrap();
        fs::write(
            dir.join(format!("{name}.csv")),
            "0.0,0.3\n0.5,0.3\n0.5,0.3\n1.0,0.3\n",
        )
        .unwrap();
    }

    fn registry(dir: &Path) -> CompanyRegistry {
        let toml = format!(
            r#"
            [paths]
            artifact_dir = "{}"

            [[companies]]
            name = "Adani"
            country = "India"
            model = "adani.json"
            scaler = "adani_scaler.json"
            dataset = "adani.csv"

            [[companies]]
            name = "Honda"
            country = "Japan"
            model = "honda.json"
            scaler = "honda_scaler.json"
            dataset = "honda.csv"
            "#,
            dir.display()
        );
        CompanyRegistry::from_config(&AppConfig::from_toml_str(&toml).unwrap())
    }

    #[test]
    fn evaluates_rmse_in_price_units() {
        let dir = TempDir::new().unwrap();
        write_company(dir.path(), "adani");
        let reg = registry(dir.path());

        // predictions 0.5, 0.5 vs targets 0.5, 1.0 -> errors 0 and 50 price units
        let value = evaluate_company(reg.get("Adani").unwrap(), 2).unwrap();
        let expected = (2500.0f64 / 2.0).sqrt();
        assert!((value - expected).abs() < 1e-6, "{}", value);
    }

    #[test]
    fn evaluate_all_skips_companies_without_models() {
        let dir = TempDir::new().unwrap();
        write_company(dir.path(), "adani");
        let metrics = evaluate_all(&registry(dir.path()), 2);
        assert_eq!(metrics.keys().collect::<Vec<_>>(), vec!["Adani"]);
    }

    #[test]
    fn metrics_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("metrics.json");
        let mut metrics = Metrics::new();
        metrics.insert("TCS".to_string(), 12.5);

        write_metrics(&path, &metrics).unwrap();
        assert_eq!(load_metrics(&path).unwrap(), metrics);
        assert!(matches!(
            load_metrics(&dir.path().join("none.json")),
            Err(ArtifactError::Missing { kind: ArtifactKind::Metrics, .. })
        ));
    }
}
