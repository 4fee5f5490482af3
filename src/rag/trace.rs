//! JSON trace files for RAG queries.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::ContextEntry;
use crate::constants::{
    RAG_TRACE_PREFIX, TRACE_DIGEST_HEX_CHARS, TRACE_NAME_MAX_CHARS, truncate_chars,
};

/// Everything logged about one RAG query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagTrace {
    /// Local time, `%Y-%m-%dT%H:%M:%S`.
    pub timestamp: String,
    pub query: String,
    pub latency_seconds: f64,
    pub contexts: Vec<ContextEntry>,
    pub response: String,
}

impl RagTrace {
    /// Writes the trace into `dir` (created if needed) and returns the file path.
    pub async fn write_to_dir(&self, dir: &Path) -> std::io::Result<PathBuf> {
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(trace_file_name(&self.query));
        let json = serde_json::to_vec_pretty(self)?;
        tokio::fs::write(&path, json).await?;
        Ok(path)
    }
}

/// `rag_trace_{prefix}_{digest}.json`.
///
/// The prefix is the first 40 characters of the query with spaces turned into `_` and `?`
/// plus path-hostile characters dropped. The digest is taken over the whole query so two
/// queries sharing a prefix get distinct files.
pub fn trace_file_name(query: &str) -> String {
    let prefix: String = truncate_chars(query, TRACE_NAME_MAX_CHARS)
        .chars()
        .filter_map(|c| match c {
            ' ' => Some('_'),
            '?' | '/' | '\\' | ':' | '*' | '"' | '<' | '>' | '|' | '\0' => None,
            c if c.is_control() => None,
            c => Some(c),
        })
        .collect();

    let digest = blake3::hash(query.as_bytes()).to_hex();
    format!(
        "{}{}_{}.json",
        RAG_TRACE_PREFIX,
        prefix,
        &digest.as_str()[..TRACE_DIGEST_HEX_CHARS]
    )
}
