//! Grounded question answering: retrieve, build the prompt, generate, log.

pub mod error;
pub mod trace;


pub use error::{RagError, RagResult};
pub use trace::{RagTrace, trace_file_name};

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::constants::{QUESTION_LABEL, SNIPPET_MAX_CHARS, round_latency, truncate_chars};
use crate::vertex::{RagBackend, RetrievedContext};

/// A retrieved chunk as reported to callers and written to traces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextEntry {
    /// 1-based position in the retrieval result.
    pub rank: usize,
    pub source_uri: String,
    pub snippet: String,
    /// Relevance reported by the retrieval service, when it reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

/// Result of one RAG query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagAnswer {
    pub query: String,
    pub response: String,
    pub latency_seconds: f64,
    pub contexts: Vec<ContextEntry>,
    /// Where the trace was written, if writing succeeded.
    #[serde(skip)]
    pub trace_path: Option<PathBuf>,
}

pub struct RagService {
    backend: Arc<dyn RagBackend>,
    trace_dir: PathBuf,
}

impl RagService {
    pub fn new(backend: Arc<dyn RagBackend>, trace_dir: impl Into<PathBuf>) -> Self {
        Self {
            backend,
            trace_dir: trace_dir.into(),
        }
    }

    #[instrument(skip(self, user_query))]
    pub async fn query(&self, user_query: &str) -> RagResult<RagAnswer> {
        if user_query.trim().is_empty() {
            return Err(RagError::EmptyQuery);
        }

        let started = Instant::now();

        let retrieved = self
            .backend
            .retrieve_contexts(user_query)
            .await
            .map_err(RagError::Retrieval)?;
        let contexts = rank_contexts(retrieved);

        let prompt = build_prompt(&contexts, user_query);

        let response = self
            .backend
            .generate_content(&prompt)
            .await
            .map_err(RagError::Generation)?
            .trim()
            .to_string();

        let latency_seconds = round_latency(started.elapsed().as_secs_f64());

        let trace = RagTrace {
            timestamp: chrono::Local::now().format("%Y-%m-%dT%H:%M:%S").to_string(),
            query: user_query.to_string(),
            latency_seconds,
            contexts,
            response,
        };

        let trace_path = match trace.write_to_dir(&self.trace_dir).await {
            Ok(path) => {
                info!(path = %path.display(), latency_seconds, "RAG query logged");
                Some(path)
            }
            Err(e) => {
                warn!(error = %e, "Failed to write RAG trace");
                None
            }
        };

        Ok(RagAnswer {
            query: trace.query,
            response: trace.response,
            latency_seconds,
            contexts: trace.contexts,
            trace_path,
        })
    }
}

/// Ranks contexts from 1 and cuts each snippet to [`SNIPPET_MAX_CHARS`].
pub fn rank_contexts(retrieved: Vec<RetrievedContext>) -> Vec<ContextEntry> {
    retrieved
        .into_iter()
        .enumerate()
        .map(|(i, ctx)| ContextEntry {
            rank: i + 1,
            source_uri: ctx.source_uri.unwrap_or_else(|| "unknown".to_string()),
            snippet: truncate_chars(&ctx.text, SNIPPET_MAX_CHARS).to_string(),
            score: ctx.score,
        })
        .collect()
}

/// `"{snippets joined by blank lines}\n\nFrage: {query}"`.
pub fn build_prompt(contexts: &[ContextEntry], user_query: &str) -> String {
    let context_text = contexts
        .iter()
        .map(|c| c.snippet.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    format!("{}\n\n{}: {}", context_text, QUESTION_LABEL, user_query)
}
