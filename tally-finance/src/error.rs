//! Errors loading rule and mapping files

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FinanceError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid payment rule: {0}")]
    InvalidRule(String),
}

pub type Result<T> = std::result::Result<T, FinanceError>;
