//! Managed retrieval and generation on Vertex AI.
//!
//! [`RagBackend`] is the seam the RAG service talks to. [`VertexClient`] implements it over
//! the Vertex AI REST API; the mock implementation serves canned contexts for tests.

pub mod auth;
pub mod client;
pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod model;

#[cfg(test)]
mod tests;

use async_trait::async_trait;

pub use auth::{AccessToken, GcloudToken, MetadataServerToken, StaticToken, TokenChain, TokenProvider};
pub use client::VertexClient;
pub use error::{VertexError, VertexResult};
#[cfg(any(test, feature = "mock"))]
pub use mock::MockRagBackend;

/// One retrieved chunk, as returned by the retrieval service.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedContext {
    pub source_uri: Option<String>,
    pub text: String,
    pub score: Option<f64>,
}

#[async_trait]
/// Retrieval over a document corpus plus a generative model.
pub trait RagBackend: Send + Sync {
    /// Retrieves context chunks relevant to `query`, best first.
    async fn retrieve_contexts(&self, query: &str) -> VertexResult<Vec<RetrievedContext>>;

    /// Generates a response for `prompt`. Returns an empty string when the model produced none.
    async fn generate_content(&self, prompt: &str) -> VertexResult<String>;
}
