use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use super::error::{RunnerError, RunnerResult};
use super::{RunOutcome, TestRunner};
use crate::config::RunnerConfig;

/// Runs `program args... <job file>` as a child process.
pub struct ProcessRunner {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl ProcessRunner {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    pub fn from_config(config: &RunnerConfig) -> Self {
        Self::new(config.program.clone(), config.args.clone(), config.timeout)
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

#[async_trait]
impl TestRunner for ProcessRunner {
    async fn run(&self, job_file: &Path) -> RunnerResult<RunOutcome> {
        let started = Instant::now();

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg(job_file)
            .kill_on_drop(true)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!(program = %self.program, job = %job_file.display(), "Spawning test runner");

        let child = cmd.spawn().map_err(|e| RunnerError::Spawn {
            program: self.program.clone(),
            source: e,
        })?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(res) => res?,
            Err(_) => {
                warn!(timeout = ?self.timeout, "Test runner timed out");
                return Err(RunnerError::Timeout(self.timeout));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if !output.status.success() {
            return Err(RunnerError::Failed {
                status: output.status.to_string(),
                stderr,
            });
        }

        Ok(RunOutcome {
            stdout,
            stderr,
            elapsed: started.elapsed(),
        })
    }
}
