//! Prompt relay through the external test runner.
//!
//! Each request becomes a job: attachments and a job file are written into a private
//! temporary directory, the runner is invoked on the job file, and the JSON result it leaves
//! in the results directory is returned verbatim.

pub mod error;

#[cfg(test)]
mod tests;

pub use error::{GenerationError, GenerationResult};

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use crate::job::{
    Attachment, JobDescription, JobInput, MediaKind, generate_test_id, sanitize_filename,
};
use crate::runner::{ResultLookup, ResultsSnapshot, TestRunner, find_result, load_result};

/// A prompt plus optional media, as received from a caller.
#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    pub prompt: String,
    pub attachments: Vec<Attachment>,
    pub context: Map<String, Value>,
    /// Caller-chosen job id. Unsafe characters are replaced.
    pub test_id: Option<String>,
    pub model: Option<String>,
    pub client: Option<String>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }
}

/// The runner's result together with the job it belongs to.
#[derive(Debug, Clone)]
pub struct GenerationOutput {
    pub test_id: String,
    pub result: Value,
}

/// Turns requests into runner jobs and collects their results.
pub struct GenerationService {
    runner: Arc<dyn TestRunner>,
    results_dir: PathBuf,
    default_model: String,
    default_client: String,
    permits: Semaphore,
}

impl GenerationService {
    pub fn new(
        runner: Arc<dyn TestRunner>,
        results_dir: impl Into<PathBuf>,
        default_model: impl Into<String>,
        default_client: impl Into<String>,
        concurrency: usize,
    ) -> Self {
        Self {
            runner,
            results_dir: results_dir.into(),
            default_model: default_model.into(),
            default_client: default_client.into(),
            permits: Semaphore::new(concurrency.max(1)),
        }
    }

    #[instrument(skip(self, request), fields(test_id = tracing::field::Empty))]
    pub async fn process(&self, request: GenerationRequest) -> GenerationResult<GenerationOutput> {
        if request.prompt.trim().is_empty() {
            return Err(GenerationError::EmptyPrompt);
        }

        let test_id = request
            .test_id
            .as_deref()
            .and_then(sanitize_test_id)
            .unwrap_or_else(generate_test_id);
        tracing::Span::current().record("test_id", tracing::field::display(&test_id));

        let job_dir = tempfile::Builder::new().prefix("support_job_").tempdir()?;

        let job_file_name = format!("{}.json", test_id);
        let mut input = JobInput::text(request.prompt, request.context);
        for (path, kind) in
            write_attachments(job_dir.path(), &request.attachments, &job_file_name).await?
        {
            input.attach(kind, path);
        }

        let job = JobDescription {
            test_id: test_id.clone(),
            client: request.client.unwrap_or_else(|| self.default_client.clone()),
            model: request.model.unwrap_or_else(|| self.default_model.clone()),
            input,
        };
        let job_file = job_dir.path().join(&job_file_name);
        job.write_to(&job_file).await?;

        debug!(
            input_type = job.input.kind.as_str(),
            model = %job.model,
            "Job file written"
        );

        let lookup = {
            let _permit = self
                .permits
                .acquire()
                .await
                .map_err(|e| GenerationError::Io(std::io::Error::other(e)))?;

            let before = ResultsSnapshot::capture(&self.results_dir).await?;
            let outcome = self.runner.run(&job_file).await?;
            info!(elapsed_ms = outcome.elapsed.as_millis() as u64, "Test runner finished");

            find_result(&self.results_dir, &test_id, &before).await?
        };

        let path = match &lookup {
            ResultLookup::ById(path) => path,
            ResultLookup::Newest(path) => {
                warn!(path = %path.display(), "Result picked by modification time");
                path
            }
            ResultLookup::NotFound => return Err(GenerationError::NoResult { test_id }),
        };

        let result = load_result(path).await?;
        Ok(GenerationOutput { test_id, result })
    }
}

/// Keeps `[A-Za-z0-9_.-]`, replacing anything else with `_`.
fn sanitize_test_id(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.trim_matches(['.', '_']).is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// Stores attachments under unique, sanitized names in `dir`, never using `reserved`.
async fn write_attachments(
    dir: &Path,
    attachments: &[Attachment],
    reserved: &str,
) -> std::io::Result<Vec<(PathBuf, Option<MediaKind>)>> {
    let mut used = HashSet::from([reserved.to_string()]);
    let mut written = Vec::with_capacity(attachments.len());

    for (n, attachment) in attachments.iter().enumerate() {
        let mut name = sanitize_filename(&attachment.filename)
            .unwrap_or_else(|| format!("attachment_{}", n));
        if !used.insert(name.clone()) {
            name = format!("{}_{}", n, name);
            used.insert(name.clone());
        }

        let path = dir.join(&name);
        tokio::fs::write(&path, &attachment.data).await?;
        written.push((path, attachment.kind()));
    }

    Ok(written)
}
