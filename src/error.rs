use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CovgateError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("History file {} is corrupt: {source}", path.display())]
    CorruptHistory {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("No history entry matches '{0}'")]
    RefNotFound(String),

    #[error("Git diff unavailable: {0}")]
    DiffUnavailable(String),

    #[error("Cannot resolve git reference '{0}'")]
    DiffResolveFailed(String),

    #[error("Failed to write history file {}: {source}", path.display())]
    WriteHistory {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Render error: {0}")]
    Render(String),
}

pub type Result<T> = std::result::Result<T, CovgateError>;
