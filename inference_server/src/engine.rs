use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use forecasting::{ForecastError, Window, forecast, rescale, with_model};
use log::{debug, error, warn};
use market_data::dataset::load_dataset;
use market_data::scaler::load_scaler;
use market_data::{AppConfig, ArtifactError, ArtifactKind, CompanyArtifacts, CompanyRegistry, ScalerError};
use thiserror::Error;

use crate::misc::{Days, ErrorBody};

#[derive(Error, Debug)]
pub enum PredictError {
    #[error("Invalid request body: {0}")]
    BadRequest(String),

    #[error("Invalid company: {0}")]
    UnknownCompany(String),

    #[error("Invalid days {requested:?}: expected a whole number between 0 and {max}")]
    InvalidHorizon { requested: String, max: usize },

    #[error("cannot load {kind} for company {company}: {source}")]
    Artifact {
        company: String,
        kind: ArtifactKind,
        #[source]
        source: ArtifactError,
    },

    #[error("insufficient history for {company}: need {needed} observations, have {available}")]
    InsufficientData {
        company: String,
        needed: usize,
        available: usize,
    },

    #[error("forecast failed for {company}: {source}")]
    Inference {
        company: String,
        #[source]
        source: ForecastError,
    },

    #[error("rescaling failed for {company}: {source}")]
    Rescale {
        company: String,
        #[source]
        source: ScalerError,
    },

    #[error("forecast task failed: {0}")]
    Task(String),
}

impl PredictError {
    fn artifact(company: &str, source: ArtifactError) -> Self {
        PredictError::Artifact {
            company: company.to_string(),
            kind: source.kind(),
            source,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PredictError::BadRequest(_) => "bad_request",
            PredictError::UnknownCompany(_) => "unknown_company",
            PredictError::InvalidHorizon { .. } => "invalid_horizon",
            PredictError::Artifact {
                source: ArtifactError::Missing { .. },
                ..
            } => "missing_artifact",
            PredictError::Artifact { .. } => "artifact_load",
            PredictError::InsufficientData { .. } => "insufficient_data",
            PredictError::Inference { .. } => "inference",
            PredictError::Rescale { .. } => "rescale",
            PredictError::Task(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            PredictError::BadRequest(_)
            | PredictError::UnknownCompany(_)
            | PredictError::InvalidHorizon { .. } => StatusCode::BAD_REQUEST,
            PredictError::InsufficientData { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for PredictError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Prediction failed: {}", self);
        } else {
            warn!("Prediction rejected: {}", self);
        }
        let body = ErrorBody {
            error: self.to_string(),
            kind: self.kind(),
        };
        (status, Json(body)).into_response()
    }
}

/// Per-request forecast pipeline: resolve company, load its artifacts,
/// forecast, and rescale to price units. Nothing is cached between requests.
pub struct ForecastEngine {
    registry: CompanyRegistry,
    window_size: usize,
    max_horizon: usize,
    default_days: usize,
}

impl ForecastEngine {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            registry: CompanyRegistry::from_config(config),
            window_size: config.forecast.window_size,
            max_horizon: config.forecast.max_horizon,
            default_days: config.forecast.default_days,
        }
    }

    pub fn registry(&self) -> &CompanyRegistry {
        &self.registry
    }

    pub fn resolve(&self, company: Option<&str>) -> Result<&CompanyArtifacts, PredictError> {
        let name = company.unwrap_or_default();
        self.registry
            .get(name)
            .ok_or_else(|| PredictError::UnknownCompany(name.to_string()))
    }

    /// Validates the requested horizon before any artifact is touched.
    pub fn horizon(&self, days: Option<&Days>) -> Result<usize, PredictError> {
        let invalid = |requested: String| PredictError::InvalidHorizon {
            requested,
            max: self.max_horizon,
        };

        let requested = match days {
            None => return Ok(self.default_days),
            Some(Days::Number(n)) => *n,
            Some(Days::Float(f)) if f.is_finite() && f.fract() == 0.0 => *f as i64,
            Some(Days::Float(f)) => return Err(invalid(f.to_string())),
            Some(Days::Text(text)) => text
                .trim()
                .parse::<i64>()
                .map_err(|_| invalid(text.clone()))?,
        };

        match usize::try_from(requested) {
            Ok(horizon) if horizon <= self.max_horizon => Ok(horizon),
            _ => Err(invalid(requested.to_string())),
        }
    }

    /// Blocking: reads model, scaler and dataset from disk, in that order.
    pub fn run(&self, company: &CompanyArtifacts, horizon: usize) -> Result<Vec<f64>, PredictError> {
        let name = company.name.as_str();
        debug!("Forecasting {} steps for {}", horizon, name);

        with_model(&company.model, |model| -> Result<Vec<f64>, PredictError> {
            let scaler = load_scaler(&company.scaler).map_err(|e| PredictError::artifact(name, e))?;
            let data = load_dataset(&company.dataset).map_err(|e| PredictError::artifact(name, e))?;

            let window = Window::from_history(&data, self.window_size).map_err(|_| {
                PredictError::InsufficientData {
                    company: name.to_string(),
                    needed: self.window_size,
                    available: data.nrows(),
                }
            })?;

            let scaled = forecast(model, window, horizon).map_err(|source| PredictError::Inference {
                company: name.to_string(),
                source,
            })?;

            rescale(&scaler, &scaled, data.ncols()).map_err(|source| PredictError::Rescale {
                company: name.to_string(),
                source,
            })
        })
        .map_err(|e| PredictError::artifact(name, e))?
    }
}

/// `(low, high)` of a forecast, `None` when it is empty.
pub fn bounds(values: &[f64]) -> Option<(f64, f64)> {
    let first = *values.first()?;
    Some(
        values
            .iter()
            .fold((first, first), |(lo, hi), v| (lo.min(*v), hi.max(*v))),
    )
}
