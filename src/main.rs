//! Gemini support HTTP server entrypoint.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use mimalloc::MiMalloc;
use tokio::net::TcpListener;
use tokio::signal;

use gemini_support::config::Config;
use gemini_support::gateway::{HandlerState, create_router_with_config};
use gemini_support::generation::GenerationService;
use gemini_support::rag::RagService;
use gemini_support::runner::ProcessRunner;
use gemini_support::vertex::{TokenChain, VertexClient};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if std::env::args().any(|arg| arg == "--health-check") {
        std::process::exit(run_health_check().await);
    }

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;
    config.validate()?;
    let addr: SocketAddr = config.socket_addr().parse()?;

    tracing::info!(
        bind_addr = %config.bind_addr,
        port = config.port,
        results_dir = %config.results_dir.display(),
        "Gemini support backend starting"
    );

    tokio::fs::create_dir_all(&config.results_dir).await?;

    let runner = ProcessRunner::from_config(&config.runner);
    tracing::info!(
        program = runner.program(),
        timeout_secs = config.runner.timeout.as_secs(),
        concurrency = config.runner.concurrency,
        "Test runner configured"
    );

    let generation = Arc::new(GenerationService::new(
        Arc::new(runner),
        config.results_dir.clone(),
        config.default_model.clone(),
        config.default_client.clone(),
        config.runner.concurrency,
    ));

    let rag = match config.vertex() {
        Ok(settings) => {
            tracing::info!(
                project = %settings.project_id,
                location = %settings.location,
                model = %settings.generation_model,
                "Vertex AI RAG engine enabled"
            );
            let tokens = Arc::new(TokenChain::from_static_or_ambient(
                config.access_token.clone(),
            ));
            let client = VertexClient::new(settings, tokens);
            Some(Arc::new(RagService::new(
                Arc::new(client),
                config.results_dir.clone(),
            )))
        }
        Err(e) => {
            tracing::warn!("{}. /rag_query will answer 503.", e);
            None
        }
    };

    let state = HandlerState::new(generation, rag);
    let app = create_router_with_config(state, &config);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn run_health_check() -> i32 {
    let port = std::env::var("SUPPORT_PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(8000);

    let url = format!("http://127.0.0.1:{}/health", port);

    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(1))
        .build()
    {
        Ok(client) => client,
        Err(_) => return 1,
    };

    match client.get(&url).send().await {
        Ok(res) if res.status().is_success() => 0,
        _ => 1,
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
