//! Baseline vs RAG evaluation against a running gateway.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use gemini_support::constants::DEFAULT_RESULTS_DIR;
use gemini_support::evaluation::{EvalClient, Evaluation, default_queries, load_queries};

/// Compare plain model answers with RAG-grounded answers for a query set
#[derive(Parser, Debug)]
#[command(name = "evaluate-rag", version, about, long_about = None)]
struct Cli {
    /// Base URL of the gateway
    #[arg(long, default_value = "http://127.0.0.1:8000")]
    api_base: String,

    /// Directory for comparison files and the summary CSV
    #[arg(long, default_value = DEFAULT_RESULTS_DIR)]
    results_dir: PathBuf,

    /// JSON file with `[{"id": ..., "query": ...}]` (built-in queries if omitted)
    #[arg(long)]
    queries: Option<PathBuf>,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 300)]
    timeout_secs: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let queries = match &cli.queries {
        Some(path) => load_queries(path).await?,
        None => default_queries(),
    };

    println!("\n=== Running Baseline vs RAG Evaluation ===\n");
    tracing::info!(
        api_base = %cli.api_base,
        queries = queries.len(),
        results_dir = %cli.results_dir.display(),
        "Starting evaluation"
    );

    let client = EvalClient::new(cli.api_base, Duration::from_secs(cli.timeout_secs))?;
    let evaluation = Evaluation::new(client, cli.results_dir);
    let (records, summary) = evaluation.run(&queries).await?;

    for record in &records {
        println!(
            "{}: baseline {:.3}s, rag {:.3}s (diff {:+.3}s)",
            record.id,
            record.baseline_latency,
            record.rag_latency,
            record.latency_diff()
        );
    }

    println!("\nEvaluation complete!");
    println!("Summary CSV: {}", summary.display());
    Ok(())
}
