use serde::{Deserialize, Serialize};

/// Input type recorded in a job file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Text,
    Image,
    Audio,
    Video,
}

impl MediaKind {
    /// Infers the media kind from a file extension (case-insensitive).
    pub fn from_filename(name: &str) -> Option<Self> {
        let lower = name.to_lowercase();
        let ext = lower.rsplit_once('.').map(|(_, ext)| ext)?;
        match ext {
            "jpg" | "jpeg" | "png" => Some(Self::Image),
            "wav" | "mp3" => Some(Self::Audio),
            "mp4" => Some(Self::Video),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Audio => "audio",
            Self::Video => "video",
        }
    }
}

/// An uploaded file, held in memory until the job directory is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub data: Vec<u8>,
}

impl Attachment {
    pub fn new(filename: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            data: data.into(),
        }
    }

    pub fn kind(&self) -> Option<MediaKind> {
        MediaKind::from_filename(&self.filename)
    }
}

/// Keeps only the last path component of an uploaded file name.
///
/// Returns `None` when nothing usable is left (empty, `.` or `..`).
pub fn sanitize_filename(name: &str) -> Option<String> {
    let last = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim()
        .replace('\0', "");

    match last.as_str() {
        "" | "." | ".." => None,
        _ => Some(last),
    }
}
