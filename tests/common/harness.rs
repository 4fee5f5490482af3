use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use gemini_support::gateway::{HandlerState, create_router_with_state};
use gemini_support::generation::GenerationService;
use gemini_support::rag::RagService;
use gemini_support::runner::MockTestRunner;
use gemini_support::vertex::MockRagBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunnerMode {
    #[default]
    Answering,
    Silent,
    Failing,
}

#[derive(Debug, Clone)]
pub struct TestServerConfig {
    pub runner: RunnerMode,
    pub rag_enabled: bool,
    pub concurrency: usize,
}

impl Default for TestServerConfig {
    fn default() -> Self {
        Self {
            runner: RunnerMode::Answering,
            rag_enabled: true,
            concurrency: 1,
        }
    }
}

impl TestServerConfig {
    pub fn without_rag() -> Self {
        Self {
            rag_enabled: false,
            ..Self::default()
        }
    }

    pub fn with_runner(runner: RunnerMode) -> Self {
        Self {
            runner,
            ..Self::default()
        }
    }
}

/// A gateway on an ephemeral port backed by the mock runner and RAG backend.
pub struct TestServer {
    addr: SocketAddr,
    results_dir: PathBuf,
    pub runner: MockTestRunner,
    pub rag_backend: MockRagBackend,
    handle: JoinHandle<()>,
    _temp: TempDir,
}

impl TestServer {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    /// Stops serving; later requests fail at the transport level.
    pub fn shutdown(&self) {
        self.handle.abort();
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub async fn spawn_test_server(config: TestServerConfig) -> anyhow::Result<TestServer> {
    let temp = TempDir::new()?;
    let results_dir = temp.path().join("results");

    let runner = match config.runner {
        RunnerMode::Answering => MockTestRunner::new(&results_dir),
        RunnerMode::Silent => MockTestRunner::silent(&results_dir),
        RunnerMode::Failing => MockTestRunner::failing(&results_dir),
    };
    let rag_backend = MockRagBackend::with_sample_contexts();

    let generation = Arc::new(GenerationService::new(
        Arc::new(runner.clone()),
        &results_dir,
        "gemini-2.5-flash",
        "gemini",
        config.concurrency,
    ));
    let rag = config
        .rag_enabled
        .then(|| Arc::new(RagService::new(Arc::new(rag_backend.clone()), &results_dir)));

    let app = create_router_with_state(HandlerState::new(generation, rag));

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Ok(TestServer {
        addr,
        results_dir,
        runner,
        rag_backend,
        handle,
        _temp: temp,
    })
}
