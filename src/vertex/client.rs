use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use super::auth::TokenProvider;
use super::error::{VertexError, VertexResult};
use super::model::{
    GenerateContentRequest, GenerateContentResponse, RagQuery, RagResource, RagRetrievalConfig,
    RetrieveContextsRequest, RetrieveContextsResponse, VertexRagStore,
};
use super::{RagBackend, RetrievedContext};
use crate::config::VertexSettings;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Vertex AI REST client for RAG retrieval and Gemini generation.
pub struct VertexClient {
    http: HttpClient,
    settings: VertexSettings,
    tokens: Arc<dyn TokenProvider>,
    base_url: String,
}

impl VertexClient {
    pub fn new(settings: VertexSettings, tokens: Arc<dyn TokenProvider>) -> Self {
        let base_url = format!("https://{}-aiplatform.googleapis.com/v1", settings.location);
        Self {
            http: HttpClient::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_else(|_| HttpClient::new()),
            settings,
            tokens,
            base_url,
        }
    }

    /// Points the client at another API root (e.g. a regional proxy or a test server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn location_path(&self) -> String {
        format!(
            "{}/projects/{}/locations/{}",
            self.base_url, self.settings.project_id, self.settings.location
        )
    }

    pub fn retrieve_contexts_url(&self) -> String {
        format!("{}:retrieveContexts", self.location_path())
    }

    pub fn generate_content_url(&self) -> String {
        format!(
            "{}/publishers/google/models/{}:generateContent",
            self.location_path(),
            self.settings.generation_model
        )
    }

    async fn post_json<Req, Resp>(&self, url: &str, body: &Req) -> VertexResult<Resp>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let token = self.tokens.access_token().await?;

        let resp = self
            .http
            .post(url)
            .bearer_auth(&token.token)
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            self.tokens.invalidate();
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(VertexError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = resp.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| VertexError::Decode(e.to_string()))
    }
}

#[async_trait]
impl RagBackend for VertexClient {
    #[instrument(skip(self, query))]
    async fn retrieve_contexts(&self, query: &str) -> VertexResult<Vec<RetrievedContext>> {
        let request = RetrieveContextsRequest {
            vertex_rag_store: VertexRagStore {
                rag_resources: vec![RagResource {
                    rag_corpus: self.settings.rag_corpus.clone(),
                }],
            },
            query: RagQuery {
                text: query.to_string(),
                rag_retrieval_config: self.settings.top_k.map(|top_k| RagRetrievalConfig { top_k }),
            },
        };

        let response: RetrieveContextsResponse = self
            .post_json(&self.retrieve_contexts_url(), &request)
            .await?;

        let contexts: Vec<RetrievedContext> = response
            .contexts
            .contexts
            .into_iter()
            .map(|c| RetrievedContext {
                source_uri: c.source_uri,
                text: c.text,
                score: c.score,
            })
            .collect();

        debug!(count = contexts.len(), "Contexts retrieved");
        Ok(contexts)
    }

    #[instrument(skip(self, prompt), fields(model = %self.settings.generation_model))]
    async fn generate_content(&self, prompt: &str) -> VertexResult<String> {
        let request = GenerateContentRequest::user_text(prompt);

        let response: GenerateContentResponse = self
            .post_json(&self.generate_content_url(), &request)
            .await?;

        Ok(response.text().unwrap_or_default())
    }
}
