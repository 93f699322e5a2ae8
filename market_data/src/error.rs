use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Which persisted artifact a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Model,
    Scaler,
    Dataset,
    RiskTable,
    Metrics,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArtifactKind::Model => "model",
            ArtifactKind::Scaler => "scaler",
            ArtifactKind::Dataset => "dataset",
            ArtifactKind::RiskTable => "risk table",
            ArtifactKind::Metrics => "metrics",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("missing {kind} file: {}", path.display())]
    Missing { kind: ArtifactKind, path: PathBuf },

    #[error("cannot read {kind} file {}: {source}", path.display())]
    Io {
        kind: ArtifactKind,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt {kind} file {}: {reason}", path.display())]
    Corrupt {
        kind: ArtifactKind,
        path: PathBuf,
        reason: String,
    },
}

impl ArtifactError {
    pub fn kind(&self) -> ArtifactKind {
        match self {
            ArtifactError::Missing { kind, .. }
            | ArtifactError::Io { kind, .. }
            | ArtifactError::Corrupt { kind, .. } => *kind,
        }
    }

    pub fn corrupt(kind: ArtifactKind, path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        ArtifactError::Corrupt {
            kind,
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum ScalerError {
    #[error("scaler expects {expected} features, got {actual}")]
    Width { expected: usize, actual: usize },

    #[error("scaler parameters have mismatched lengths ({0})")]
    Parameters(String),
}

#[derive(Error, Debug)]
pub enum MarketDataError {
    #[error("Config not found: {0}")]
    ConfigValueNotFoundError(#[from] config::ConfigError),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}
