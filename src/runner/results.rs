//! Locating the file a runner wrote for a given job.
//!
//! The results directory is snapshotted before a run. Afterwards only files that are new or
//! whose modification time changed are candidates, and files other tools keep in the same
//! directory (RAG traces, evaluation comparisons) are skipped. Among the candidates, a file
//! named after the job id is trusted first; otherwise the newest one is used, which is only
//! sound while runs are serialized.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde_json::Value;

use super::error::{RunnerError, RunnerResult};
use crate::constants::{COMPARISON_SUFFIX, RAG_TRACE_PREFIX};

/// How a result file was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultLookup {
    /// The file name carries the job id.
    ById(PathBuf),
    /// Newest file written during the run.
    Newest(PathBuf),
    NotFound,
}

impl ResultLookup {
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::ById(p) | Self::Newest(p) => Some(p),
            Self::NotFound => None,
        }
    }
}

/// Modification times of the result files present before a run.
#[derive(Debug, Clone, Default)]
pub struct ResultsSnapshot {
    seen: HashMap<PathBuf, SystemTime>,
}

impl ResultsSnapshot {
    /// Records every candidate file in `results_dir`. A missing directory is empty.
    pub async fn capture(results_dir: &Path) -> RunnerResult<Self> {
        let seen = result_files(results_dir).await?.into_iter().collect();
        Ok(Self { seen })
    }

    /// True when `path` did not exist at capture time or has been rewritten since.
    fn is_fresh(&self, path: &Path, modified: SystemTime) -> bool {
        self.seen.get(path) != Some(&modified)
    }
}

/// Scans `results_dir` for the result of job `test_id`, ignoring everything in `before`.
pub async fn find_result(
    results_dir: &Path,
    test_id: &str,
    before: &ResultsSnapshot,
) -> RunnerResult<ResultLookup> {
    let mut by_id: Option<(SystemTime, PathBuf)> = None;
    let mut newest: Option<(SystemTime, PathBuf)> = None;

    for (path, modified) in result_files(results_dir).await? {
        if !before.is_fresh(&path, modified) {
            continue;
        }

        let named_after_job = path
            .file_stem()
            .and_then(|s| s.to_str())
            .is_some_and(|stem| stem_names_job(stem, test_id));

        if named_after_job && by_id.as_ref().is_none_or(|(t, _)| modified > *t) {
            by_id = Some((modified, path.clone()));
        }

        if newest.as_ref().is_none_or(|(t, _)| modified > *t) {
            newest = Some((modified, path));
        }
    }

    Ok(match (by_id, newest) {
        (Some((_, path)), _) => ResultLookup::ById(path),
        (None, Some((_, path))) => ResultLookup::Newest(path),
        (None, None) => ResultLookup::NotFound,
    })
}

/// Reads and parses a result file.
pub async fn load_result(path: &Path) -> RunnerResult<Value> {
    let bytes = tokio::fs::read(path).await?;
    serde_json::from_slice(&bytes).map_err(|e| RunnerError::InvalidResult {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Regular `*.json` files that may be runner output, with their modification times.
async fn result_files(results_dir: &Path) -> RunnerResult<Vec<(PathBuf, SystemTime)>> {
    let mut entries = match tokio::fs::read_dir(results_dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(RunnerError::Io(e)),
    };

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if stem.starts_with(RAG_TRACE_PREFIX) || stem.ends_with(COMPARISON_SUFFIX) {
            continue;
        }

        let metadata = entry.metadata().await?;
        if !metadata.is_file() {
            continue;
        }
        files.push((path, metadata.modified()?));
    }

    Ok(files)
}

/// The id must be the whole stem or a `_`-delimited part of it.
fn stem_names_job(stem: &str, test_id: &str) -> bool {
    if test_id.is_empty() {
        return false;
    }
    stem == test_id
        || stem.starts_with(&format!("{}_", test_id))
        || stem.ends_with(&format!("_{}", test_id))
        || stem.contains(&format!("_{}_", test_id))
}
