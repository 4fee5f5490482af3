use thiserror::Error;

use crate::vertex::VertexError;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("query must not be empty")]
    EmptyQuery,

    #[error("retrieval failed: {0}")]
    Retrieval(#[source] VertexError),

    #[error("generation failed: {0}")]
    Generation(#[source] VertexError),
}

pub type RagResult<T> = Result<T, RagError>;
