//! Error types for the rebalancer.

use std::path::PathBuf;

/// All errors that can occur during rebalancer operation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error(transparent)]
    Parse(#[from] folio::ParseError),

    #[error("cannot compute plan: {0}")]
    Rebalance(#[from] folio::RebalanceError),

    #[error(transparent)]
    Portfolio(#[from] folio::PortfolioError),

    #[error("portfolio {0} not found")]
    NotFound(String),

    #[error("portfolio {0} already exists")]
    AlreadyExists(String),

    #[error("failed to read portfolio file {path}: {source}")]
    StoreRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("portfolio file {path} holds portfolio {found}")]
    IdMismatch { path: PathBuf, found: String },

    #[error("failed to write portfolio file {path}: {source}")]
    StoreWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("execution aborted: {0}")]
    Aborted(String),

    #[error("audit log error: {0}")]
    Audit(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
