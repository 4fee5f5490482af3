use std::sync::Arc;

use crate::generation::GenerationService;
use crate::rag::RagService;

#[derive(Clone)]
pub struct HandlerState {
    pub generation: Arc<GenerationService>,

    /// `None` when Vertex AI is not configured; `/rag_query` then answers 503.
    pub rag: Option<Arc<RagService>>,
}

impl HandlerState {
    pub fn new(generation: Arc<GenerationService>, rag: Option<Arc<RagService>>) -> Self {
        Self { generation, rag }
    }
}
