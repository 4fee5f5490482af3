use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::error::{VertexError, VertexResult};
use super::{RagBackend, RetrievedContext};

/// Canned retrieval plus an echoing "model".
#[derive(Clone, Default)]
pub struct MockRagBackend {
    contexts: Vec<RetrievedContext>,
    fail_generation: bool,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl MockRagBackend {
    pub fn new(contexts: Vec<RetrievedContext>) -> Self {
        Self {
            contexts,
            ..Default::default()
        }
    }

    /// Two short maintenance snippets, one without a source URI.
    pub fn with_sample_contexts() -> Self {
        Self::new(vec![
            RetrievedContext {
                source_uri: Some("gs://support-corpus/sop_gasleck.pdf".to_string()),
                text: "Bei Gasgeruch: Bereich räumen, Zündquellen vermeiden, Leitstelle informieren."
                    .to_string(),
                score: Some(0.91),
            },
            RetrievedContext {
                source_uri: None,
                text: "Pumpstation PS-100: Dichtungen monatlich prüfen.".to_string(),
                score: Some(0.74),
            },
        ])
    }

    /// Makes every generation call fail with an API error.
    pub fn failing_generation(mut self) -> Self {
        self.fail_generation = true;
        self
    }

    /// Prompts sent to the model so far.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl RagBackend for MockRagBackend {
    async fn retrieve_contexts(&self, _query: &str) -> VertexResult<Vec<RetrievedContext>> {
        Ok(self.contexts.clone())
    }

    async fn generate_content(&self, prompt: &str) -> VertexResult<String> {
        self.prompts.lock().push(prompt.to_string());

        if self.fail_generation {
            return Err(VertexError::Api {
                status: 503,
                body: "mock generation unavailable".to_string(),
            });
        }

        let question = prompt.rsplit("\n\n").next().unwrap_or(prompt);
        Ok(format!("  Mock response for: {}\n", question))
    }
}
