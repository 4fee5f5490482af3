use thiserror::Error;

#[derive(Error, Debug)]
pub enum VertexError {
    #[error("request to Vertex AI failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Vertex AI returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("could not obtain an access token: {0}")]
    Auth(String),

    #[error("unexpected Vertex AI response: {0}")]
    Decode(String),
}

pub type VertexResult<T> = Result<T, VertexError>;
