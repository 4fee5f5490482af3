use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EvaluationError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("invalid query file {path}: {message}")]
    InvalidQueries { path: PathBuf, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type EvaluationResult<T> = Result<T, EvaluationError>;
