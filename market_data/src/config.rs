use config::{Config, ConfigBuilder, Environment, File, FileFormat, builder::DefaultState};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::MarketDataError;

pub const DEFAULT_CONFIG_PATH: &str = "forecast.toml";
pub const CONFIG_PATH_VAR: &str = "FORECAST_CONFIG";
const ENV_PREFIX: &str = "FORECAST";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Number of trailing observations fed to the model (W).
    pub window_size: usize,
    pub max_horizon: usize,
    pub default_days: usize,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            window_size: 60,
            max_horizon: 100,
            default_days: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub artifact_dir: PathBuf,
    pub metrics_file: PathBuf,
    pub company_risk: Option<PathBuf>,
    pub country_risk: Option<PathBuf>,
    pub plots_dir: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            artifact_dir: PathBuf::from("artifacts"),
            metrics_file: PathBuf::from("metrics.json"),
            company_risk: None,
            country_risk: None,
            plots_dir: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompanyConfig {
    pub name: String,
    pub country: String,
    pub model: PathBuf,
    pub scaler: PathBuf,
    pub dataset: PathBuf,
    #[serde(default)]
    pub plot: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub forecast: ForecastConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub companies: Vec<CompanyConfig>,
}

impl AppConfig {
    /// Loads `.env`, then the file named by `FORECAST_CONFIG` (or `forecast.toml`),
    /// then `FORECAST_*` environment overrides.
    pub fn from_env() -> Result<Self, MarketDataError> {
        let _ = dotenvy::dotenv();
        let path = std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::from_file(Path::new(&path))
    }

    pub fn from_file(path: &Path) -> Result<Self, MarketDataError> {
        let builder = Config::builder()
            .add_source(File::new(&path.to_string_lossy(), FileFormat::Toml));
        Self::build(builder)
    }

    pub fn from_toml_str(toml: &str) -> Result<Self, MarketDataError> {
        let builder = Config::builder().add_source(File::from_str(toml, FileFormat::Toml));
        Self::build(builder)
    }

    fn build(builder: ConfigBuilder<DefaultState>) -> Result<Self, MarketDataError> {
        let cfg = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let app: AppConfig = cfg.try_deserialize()?;
        app.validate()?;
        Ok(app)
    }

    pub fn validate(&self) -> Result<(), MarketDataError> {
        let forecast = &self.forecast;
        if forecast.window_size == 0 {
            return Err(MarketDataError::InvalidConfig(
                "forecast.window_size must be at least 1".to_string(),
            ));
        }
        if forecast.max_horizon == 0 {
            return Err(MarketDataError::InvalidConfig(
                "forecast.max_horizon must be at least 1".to_string(),
            ));
        }
        if forecast.default_days > forecast.max_horizon {
            return Err(MarketDataError::InvalidConfig(format!(
                "forecast.default_days ({}) exceeds forecast.max_horizon ({})",
                forecast.default_days, forecast.max_horizon
            )));
        }

        let mut seen = HashSet::new();
        for company in &self.companies {
            if company.name.trim().is_empty() {
                return Err(MarketDataError::InvalidConfig(
                    "company name cannot be empty".to_string(),
                ));
            }
            if !seen.insert(company.name.as_str()) {
                return Err(MarketDataError::InvalidConfig(format!(
                    "company {} is configured twice",
                    company.name
                )));
            }
        }
        Ok(())
    }

    /// Resolves an artifact path against `paths.artifact_dir`. Absolute paths are kept.
    pub fn artifact_path(&self, relative: &Path) -> PathBuf {
        self.paths.artifact_dir.join(relative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [server]
        port = 8080

        [forecast]
        window_size = 3

        [paths]
        artifact_dir = "/srv/artifacts"

        [[companies]]
        name = "Adani"
        country = "India"
        model = "models/adani_model.json"
        scaler = "scalers/adani_scaler.json"
        dataset = "scaled_data/adani_scaled_data.csv"
        plot = "adani_plot.png"

        [[companies]]
        name = "Sony"
        country = "Japan"
        model = "models/sony_model.onnx"
        scaler = "scalers/sony_scaler.json"
        dataset = "scaled_data/sony_scaled_data.bin"
    "#;

    #[test]
    fn parses_sample_and_fills_defaults() {
        let cfg = AppConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(cfg.server.host, "127.0.0.1");
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.forecast.window_size, 3);
        assert_eq!(cfg.forecast.max_horizon, 100);
        assert_eq!(cfg.forecast.default_days, 5);
        assert_eq!(cfg.companies.len(), 2);
        assert_eq!(cfg.companies[0].plot.as_deref(), Some("adani_plot.png"));
        assert!(cfg.companies[1].plot.is_none());
        assert!(cfg.paths.company_risk.is_none());
    }

    #[test]
    fn artifact_paths_are_resolved_against_artifact_dir() {
        let cfg = AppConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(
            cfg.artifact_path(&cfg.companies[0].model),
            PathBuf::from("/srv/artifacts/models/adani_model.json")
        );
        assert_eq!(
            cfg.artifact_path(Path::new("/abs/model.json")),
            PathBuf::from("/abs/model.json")
        );
    }

    #[test]
    fn rejects_zero_window() {
        let err = AppConfig::from_toml_str("[forecast]\nwindow_size = 0\n").unwrap_err();
        assert!(matches!(err, MarketDataError::InvalidConfig(_)));
    }

    #[test]
    fn rejects_default_days_above_max_horizon() {
        let err = AppConfig::from_toml_str("[forecast]\nmax_horizon = 4\ndefault_days = 5\n")
            .unwrap_err();
        assert!(err.to_string().contains("default_days"));
    }

    #[test]
    fn rejects_duplicate_companies() {
        let toml = r#"
            [[companies]]
            name = "TCS"
            country = "India"
            model = "a.json"
            scaler = "a.json"
            dataset = "a.csv"

            [[companies]]
            name = "TCS"
            country = "India"
            model = "b.json"
            scaler = "b.json"
            dataset = "b.csv"
        "#;
        let err = AppConfig::from_toml_str(toml).unwrap_err();
        assert!(err.to_string().contains("configured twice"));
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let err = AppConfig::from_file(Path::new("/nonexistent/forecast.toml")).unwrap_err();
        assert!(matches!(err, MarketDataError::ConfigValueNotFoundError(_)));
    }
}
