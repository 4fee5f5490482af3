use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Optional `metadata` part of a `/generate` upload.
///
/// ```json
/// {"test_id": "Q1_baseline", "model": "gemini-2.5-flash", "client": "gemini",
///  "input": {"prompt": "...", "context": {}}}
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerateMetadata {
    #[serde(default)]
    pub test_id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub client: Option<String>,
    #[serde(default)]
    pub context: Option<Map<String, Value>>,
    #[serde(default)]
    pub input: Option<MetadataInput>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataInput {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub context: Option<Map<String, Value>>,
}

impl GenerateMetadata {
    pub fn prompt(&self) -> Option<&str> {
        self.input
            .as_ref()
            .and_then(|input| input.prompt.as_deref())
            .filter(|p| !p.trim().is_empty())
    }

    /// `input.context` wins over the top-level `context`.
    pub fn context(&self) -> Option<&Map<String, Value>> {
        self.input
            .as_ref()
            .and_then(|input| input.context.as_ref())
            .or(self.context.as_ref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagQueryRequest {
    pub query: String,
}
