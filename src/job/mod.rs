//! Job descriptions handed to the external test runner.
//!
//! A job is a small JSON document naming the test, the client/model pair, and the input
//! (prompt, optional context, and paths of any uploaded media).

pub mod media;


pub use media::{Attachment, MediaKind, sanitize_filename};

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Input section of a job file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobInput {
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub prompt: String,
    #[serde(default)]
    pub context: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_path: Option<PathBuf>,
    /// Uploaded files whose type could not be inferred from the name.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<PathBuf>,
}

impl JobInput {
    /// A plain text input.
    pub fn text(prompt: impl Into<String>, context: Map<String, Value>) -> Self {
        Self {
            kind: MediaKind::Text,
            prompt: prompt.into(),
            context,
            image_path: None,
            audio_path: None,
            video_path: None,
            attachments: Vec::new(),
        }
    }

    /// Records a stored attachment. The last classified attachment decides `type`.
    pub fn attach(&mut self, kind: Option<MediaKind>, path: PathBuf) {
        match kind {
            Some(MediaKind::Image) => {
                self.kind = MediaKind::Image;
                self.image_path = Some(path);
            }
            Some(MediaKind::Audio) => {
                self.kind = MediaKind::Audio;
                self.audio_path = Some(path);
            }
            Some(MediaKind::Video) => {
                self.kind = MediaKind::Video;
                self.video_path = Some(path);
            }
            Some(MediaKind::Text) | None => self.attachments.push(path),
        }
    }
}

/// A complete job file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDescription {
    pub test_id: String,
    pub client: String,
    pub model: String,
    pub input: JobInput,
}

impl JobDescription {
    /// Serializes the job as pretty JSON (UTF-8 kept verbatim) and writes it to `path`.
    pub async fn write_to(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_vec_pretty(self)?;
        tokio::fs::write(path, json).await
    }

    /// Reads a job file back.
    pub async fn read_from(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Generates a job id of the form `api_{unix_seconds}_{8 hex chars}`.
pub fn generate_test_id() -> String {
    let seconds = chrono::Utc::now().timestamp();
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("api_{}_{}", seconds, &suffix[..8])
}
