use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::error::{RunnerError, RunnerResult};
use super::{RunOutcome, TestRunner};
use crate::job::JobDescription;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MockBehavior {
    /// Write `{results_dir}/{test_id}.json`.
    WriteResult,
    /// Exit cleanly without writing anything.
    Silent,
    /// Exit with a failure.
    Fail,
}

/// In-process stand-in for the test runner.
#[derive(Clone)]
pub struct MockTestRunner {
    results_dir: PathBuf,
    behavior: MockBehavior,
    jobs: Arc<Mutex<Vec<JobDescription>>>,
}

impl MockTestRunner {
    /// A runner that answers every job with `Mock response for: {prompt}`.
    pub fn new(results_dir: impl Into<PathBuf>) -> Self {
        Self {
            results_dir: results_dir.into(),
            behavior: MockBehavior::WriteResult,
            jobs: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A runner that succeeds but never writes a result.
    pub fn silent(results_dir: impl Into<PathBuf>) -> Self {
        Self {
            behavior: MockBehavior::Silent,
            ..Self::new(results_dir)
        }
    }

    /// A runner whose every run fails.
    pub fn failing(results_dir: impl Into<PathBuf>) -> Self {
        Self {
            behavior: MockBehavior::Fail,
            ..Self::new(results_dir)
        }
    }

    /// Jobs received so far, in order.
    pub fn jobs(&self) -> Vec<JobDescription> {
        self.jobs.lock().clone()
    }
}

#[async_trait]
impl TestRunner for MockTestRunner {
    async fn run(&self, job_file: &Path) -> RunnerResult<RunOutcome> {
        let job = JobDescription::read_from(job_file).await?;
        self.jobs.lock().push(job.clone());

        match self.behavior {
            MockBehavior::Fail => {
                return Err(RunnerError::Failed {
                    status: "exit status: 1".to_string(),
                    stderr: "mock runner failure".to_string(),
                });
            }
            MockBehavior::Silent => {}
            MockBehavior::WriteResult => {
                tokio::fs::create_dir_all(&self.results_dir).await?;
                let result = serde_json::json!({
                    "test_id": job.test_id,
                    "status": "ok",
                    "client": job.client,
                    "model": job.model,
                    "input_type": job.input.kind.as_str(),
                    "response": format!("Mock response for: {}", job.input.prompt),
                });
                let path = self.results_dir.join(format!("{}.json", job.test_id));
                let bytes = serde_json::to_vec_pretty(&result).map_err(std::io::Error::from)?;
                tokio::fs::write(&path, bytes).await?;
            }
        }

        Ok(RunOutcome {
            stdout: String::new(),
            stderr: String::new(),
            elapsed: Duration::from_millis(1),
        })
    }
}
