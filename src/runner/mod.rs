//! External test runner invocation and result pickup.
//!
//! The runner is a black box: it receives the path of a job file, does its work, and leaves
//! a JSON result somewhere in the results directory. `ProcessRunner` spawns it as a child
//! process; the mock implementation writes a canned result for tests.

pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod process;
pub mod results;


use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

pub use error::{RunnerError, RunnerResult};
#[cfg(any(test, feature = "mock"))]
pub use mock::MockTestRunner;
pub use process::ProcessRunner;
pub use results::{ResultLookup, ResultsSnapshot, find_result, load_result};

/// What a finished run reported on its own streams.
#[derive(Debug, Clone, Default)]
pub struct RunOutcome {
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

#[async_trait]
/// Executes one job file.
pub trait TestRunner: Send + Sync {
    /// Runs the job described by `job_file` to completion.
    async fn run(&self, job_file: &Path) -> RunnerResult<RunOutcome>;
}
