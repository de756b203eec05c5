use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrganizeError {
    #[error("invalid target {path}: {reason}")]
    InvalidTarget { path: PathBuf, reason: String },
    #[error("missing configuration: {0}")]
    ConfigurationMissing(String),
    #[error("source path {0} does not exist")]
    SourceNotFound(PathBuf),
    #[error("destination path {0} already exists")]
    DestinationExists(PathBuf),
    #[error("i/o failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("decision agent failed: {0}")]
    AgentFailure(String),
    #[error("invalid configuration: {0}")]
    Config(#[from] config::ConfigError),
    #[error("invalid exclude pattern: {0}")]
    Pattern(#[from] globset::Error),
}

impl OrganizeError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        OrganizeError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn invalid_target(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        OrganizeError::InvalidTarget {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl From<providers::ProviderError> for OrganizeError {
    fn from(err: providers::ProviderError) -> Self {
        OrganizeError::AgentFailure(err.to_string())
    }
}

pub type Result<T, E = OrganizeError> = std::result::Result<T, E>;
