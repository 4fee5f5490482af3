use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("failed to spawn test runner '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("test runner timed out after {0:?}")]
    Timeout(Duration),

    #[error("test runner exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("failed to read result file {path}: {message}")]
    InvalidResult { path: PathBuf, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type RunnerResult<T> = Result<T, RunnerError>;
