use thiserror::Error;

use crate::runner::RunnerError;

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("prompt must not be empty")]
    EmptyPrompt,

    #[error(transparent)]
    Runner(#[from] RunnerError),

    #[error("no result found for job {test_id}")]
    NoResult { test_id: String },

    #[error("failed to prepare job files: {0}")]
    Io(#[from] std::io::Error),
}

pub type GenerationResult<T> = Result<T, GenerationError>;
