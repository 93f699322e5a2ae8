pub mod config;
pub mod dataset;
pub mod error;
pub mod logger;
pub mod registry;
pub mod risk;
pub mod scaler;

pub use config::AppConfig;
pub use error::{ArtifactError, ArtifactKind, MarketDataError, ScalerError};
pub use registry::{CompanyArtifacts, CompanyRegistry};
pub use risk::RiskTables;
pub use scaler::Scaler;
