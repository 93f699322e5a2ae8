use anyhow::Result;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use forecasting::evaluation::{Metrics, load_metrics};
use log::{error, info};
use market_data::risk::{CompanyRisk, CompanyScore, CountryScore};
use market_data::{AppConfig, ArtifactError, RiskTables};
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::engine::{ForecastEngine, PredictError, bounds};
use crate::misc::{CompanyQuery, ErrorBody, GrsiQuery, PredictRequest, PredictResponse, RiskSummary};

/// Read-only state shared by all handlers, built once at startup.
#[derive(Clone)]
pub struct AppState {
    engine: Arc<ForecastEngine>,
    risk: Arc<RiskTables>,
    metrics_file: Arc<PathBuf>,
    plots_dir: Option<Arc<PathBuf>>,
}

impl AppState {
    pub fn new(config: &AppConfig, risk: RiskTables) -> Self {
        Self {
            engine: Arc::new(ForecastEngine::new(config)),
            risk: Arc::new(risk),
            metrics_file: Arc::new(config.paths.metrics_file.clone()),
            plots_dir: config.paths.plots_dir.clone().map(Arc::new),
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, ArtifactError> {
        let risk = RiskTables::load(
            config.paths.company_risk.as_deref(),
            config.paths.country_risk.as_deref(),
        )?;
        Ok(Self::new(config, risk))
    }

    fn plots_dir(&self) -> Option<PathBuf> {
        self.plots_dir.as_deref().cloned()
    }

    fn risk_summary(&self, company: &str, country: &str) -> Option<RiskSummary> {
        let grsi = self.risk.company_grsi(company).map(|score| score.grsi);
        let country_grsi = self.risk.country_grsi(country);
        if grsi.is_none() && country_grsi.is_none() {
            return None;
        }
        Some(RiskSummary {
            country: country.to_string(),
            grsi,
            country_grsi,
        })
    }
}

/// Blocking: checks that the plot file exists before advertising it.
fn plot_url(dir: Option<&Path>, plot: Option<&str>) -> Option<String> {
    let file = plot?;
    dir?.join(file).is_file().then(|| format!("/plots/{}", file))
}

/// Error for the lookup routes.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    kind: &'static str,
    message: String,
}

impl ApiError {
    fn not_found(message: String) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            kind: "not_found",
            message,
        }
    }

    fn bad_request(message: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            kind: "bad_request",
            message: message.to_string(),
        }
    }
}

impl From<ArtifactError> for ApiError {
    fn from(e: ArtifactError) -> Self {
        match e {
            ArtifactError::Missing { .. } => Self::not_found(e.to_string()),
            other => {
                error!("{}", other);
                Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    kind: "artifact_load",
                    message: other.to_string(),
                }
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message,
            kind: self.kind,
        };
        (self.status, Json(body)).into_response()
    }
}

async fn home() -> Json<Value> {
    Json(json!({ "message": "Backend is running! Use /metrics or /predict." }))
}

async fn companies(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.engine.registry().by_country())
}

/// GET /metrics returns the RMSE per company written by `evaluate_metrics`.
async fn metrics(State(state): State<AppState>) -> Result<Json<Metrics>, ApiError> {
    Ok(Json(load_metrics(&state.metrics_file)?))
}

/// GET /risk returns the whole table, or the best match for `?company=`.
async fn risk(
    State(state): State<AppState>,
    Query(query): Query<CompanyQuery>,
) -> Result<Response, ApiError> {
    match query.company {
        None => Ok(Json(state.risk.companies().to_vec()).into_response()),
        Some(company) => {
            let row: &CompanyRisk = state
                .risk
                .find_company(&company)
                .ok_or_else(|| ApiError::not_found(format!("No risk data for company {}", company)))?;
            Ok(Json(row.clone()).into_response())
        }
    }
}

async fn grsi(
    State(state): State<AppState>,
    Query(query): Query<GrsiQuery>,
) -> Result<Response, ApiError> {
    if let Some(company) = query.company {
        let score: CompanyScore = state
            .risk
            .company_grsi(&company)
            .ok_or_else(|| ApiError::not_found(format!("No GRSI for company {}", company)))?;
        return Ok(Json(score).into_response());
    }
    if let Some(country) = query.country {
        let score: CountryScore = state
            .risk
            .country_score(&country)
            .ok_or_else(|| ApiError::not_found(format!("No GRSI for country {}", country)))?;
        return Ok(Json(score).into_response());
    }
    Err(ApiError::bad_request("Provide a company or country query parameter"))
}

/// POST /predict
async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<PredictResponse>, PredictError> {
    let Json(request) = payload.map_err(|rejection| PredictError::BadRequest(rejection.body_text()))?;
    let company = state.engine.resolve(request.company.as_deref())?.clone();
    let horizon = state.engine.horizon(request.days.as_ref())?;
    info!("Predict request for {} over {} days", company.name, horizon);

    let engine = state.engine.clone();
    let artifacts = company.clone();
    let plots_dir = state.plots_dir();
    let (forecast, plot_url) = tokio::task::spawn_blocking(move || {
        let forecast = engine.run(&artifacts, horizon)?;
        let url = plot_url(plots_dir.as_deref(), artifacts.plot.as_deref());
        Ok::<_, PredictError>((forecast, url))
    })
    .await
    .map_err(|e| PredictError::Task(e.to_string()))??;

    let range = bounds(&forecast);
    info!("Forecast for {} complete: {:?}", company.name, range);

    Ok(Json(PredictResponse {
        low_likely: range.map(|(low, _)| low),
        high_likely: range.map(|(_, high)| high),
        forecast,
        plot_url,
        risk: state.risk_summary(&company.name, &company.country),
        company: company.name,
    }))
}

pub fn router(state: AppState) -> Router {
    let mut app = Router::new()
        .route("/", get(home))
        .route("/companies", get(companies))
        .route("/metrics", get(metrics))
        .route("/risk", get(risk))
        .route("/grsi", get(grsi))
        .route("/predict", post(predict));

    if let Some(dir) = &state.plots_dir {
        app = app.nest_service("/plots", ServeDir::new(dir.as_path()));
    }

    app.layer(CorsLayer::permissive()).with_state(state)
}

pub struct Server {
    state: AppState,
}

impl Server {
    pub fn init(state: AppState) -> Self {
        Self { state }
    }

    pub async fn run(self, host: &str, port: u16) -> Result<()> {
        let app = router(self.state);
        let listener = tokio::net::TcpListener::bind((host, port)).await?;
        info!("HTTP server running on {}", listener.local_addr()?);
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal, initiating graceful shutdown");
}
