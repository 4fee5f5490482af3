//! Baseline vs RAG evaluation against a running gateway.
//!
//! Every query is sent twice: once through `/generate` (the plain model, no grounding) and
//! once through `/rag_query`. Both answers and their client-side latencies are written to
//! `{id}_comparison.json`, and all queries are summarised in a CSV table.

pub mod client;
pub mod error;


pub use client::{EvalClient, TimedResponse, baseline_metadata};
pub use error::{EvaluationError, EvaluationResult};

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::constants::{COMPARISON_SUFFIX, SUMMARY_CSV_FILENAME, round_latency};
use crate::job::sanitize_filename;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalQuery {
    pub id: String,
    pub query: String,
}

impl EvalQuery {
    pub fn new(id: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            query: query.into(),
        }
    }
}

/// The built-in enterprise query set, `Q1` to `Q5`.
pub fn default_queries() -> Vec<EvalQuery> {
    vec![
        EvalQuery::new(
            "Q1",
            "Wie soll laut Notfallprozedur bei einem Gasleck vorgegangen werden?",
        ),
        EvalQuery::new(
            "Q2",
            "Welche Schritte sind in der Wartungs-Checkliste für Pumpstation PS-100 enthalten?",
        ),
        EvalQuery::new(
            "Q3",
            "Was beschreibt die Gerätespezifikation für den SmartMeter AQ-500?",
        ),
        EvalQuery::new(
            "Q4",
            "Welche Fehlercodes sind in der Vorfallsliste 2025 aufgeführt?",
        ),
        EvalQuery::new(
            "Q5",
            "Wie unterscheidet sich die Gasleck-SOP von einer typischen Wasserleck-Prozedur?",
        ),
    ]
}

/// Reads a JSON array of `{"id", "query"}` objects.
///
/// The list must be non-empty. Ids must be unique plain file names, since each id names an
/// output file.
pub async fn load_queries(path: &Path) -> EvaluationResult<Vec<EvalQuery>> {
    let invalid = |message: String| EvaluationError::InvalidQueries {
        path: path.to_path_buf(),
        message,
    };

    let bytes = tokio::fs::read(path).await?;
    let queries: Vec<EvalQuery> =
        serde_json::from_slice(&bytes).map_err(|e| invalid(e.to_string()))?;

    if queries.is_empty() {
        return Err(invalid("no queries".to_string()));
    }

    let mut seen = HashSet::new();
    for query in &queries {
        if sanitize_filename(&query.id).as_deref() != Some(query.id.as_str()) {
            return Err(invalid(format!("id {:?} cannot be used in a file name", query.id)));
        }
        if !seen.insert(query.id.as_str()) {
            return Err(invalid(format!("duplicate id {}", query.id)));
        }
    }

    Ok(queries)
}

/// One query's baseline and RAG answers side by side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRecord {
    pub id: String,
    pub query: String,
    pub baseline_response: String,
    pub rag_response: String,
    pub baseline_latency: f64,
    pub rag_latency: f64,
    /// Local time, ISO-8601.
    pub timestamp: String,
}

impl ComparisonRecord {
    pub fn latency_diff(&self) -> f64 {
        round_latency(self.rag_latency - self.baseline_latency)
    }
}

/// A row of the summary CSV.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow<'a> {
    pub id: &'a str,
    pub query: &'a str,
    pub baseline_response: &'a str,
    pub rag_response: &'a str,
    pub baseline_latency: f64,
    pub rag_latency: f64,
    pub timestamp: &'a str,
    pub latency_diff_s: f64,
}

impl<'a> From<&'a ComparisonRecord> for SummaryRow<'a> {
    fn from(record: &'a ComparisonRecord) -> Self {
        Self {
            id: &record.id,
            query: &record.query,
            baseline_response: &record.baseline_response,
            rag_response: &record.rag_response,
            baseline_latency: record.baseline_latency,
            rag_latency: record.rag_latency,
            timestamp: &record.timestamp,
            latency_diff_s: record.latency_diff(),
        }
    }
}

/// The `response` member of a reply: strings as-is, other JSON rendered, missing as `""`.
pub fn extract_response(data: &Value) -> String {
    match data.get("response") {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

pub struct Evaluation {
    client: EvalClient,
    results_dir: PathBuf,
}

impl Evaluation {
    pub fn new(client: EvalClient, results_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            results_dir: results_dir.into(),
        }
    }

    /// Runs every query in order, writing a comparison file per query and the summary at
    /// the end. Returns the records and the summary path.
    pub async fn run(
        &self,
        queries: &[EvalQuery],
    ) -> EvaluationResult<(Vec<ComparisonRecord>, PathBuf)> {
        tokio::fs::create_dir_all(&self.results_dir).await?;

        let mut records = Vec::with_capacity(queries.len());
        for query in queries {
            let record = self.compare(query).await;
            let path = write_comparison(&self.results_dir, &record).await?;
            info!(
                id = %record.id,
                baseline_latency = record.baseline_latency,
                rag_latency = record.rag_latency,
                path = %path.display(),
                "Comparison saved"
            );
            records.push(record);
        }

        let summary = write_summary(&self.results_dir, &records)?;
        Ok((records, summary))
    }

    /// Baseline first, then RAG.
    pub async fn compare(&self, query: &EvalQuery) -> ComparisonRecord {
        info!(id = %query.id, query = %query.query, "Evaluating query");

        let baseline = self.client.baseline(query).await;
        let rag = self.client.rag(&query.query).await;

        ComparisonRecord {
            id: query.id.clone(),
            query: query.query.clone(),
            baseline_response: extract_response(&baseline.data),
            rag_response: extract_response(&rag.data),
            baseline_latency: baseline.latency,
            rag_latency: rag.latency,
            timestamp: chrono::Local::now()
                .format("%Y-%m-%dT%H:%M:%S%.6f")
                .to_string(),
        }
    }
}

/// Writes `{dir}/{id}_comparison.json`.
pub async fn write_comparison(dir: &Path, record: &ComparisonRecord) -> EvaluationResult<PathBuf> {
    let path = dir.join(format!("{}{}.json", record.id, COMPARISON_SUFFIX));
    let json = serde_json::to_vec_pretty(record)?;
    tokio::fs::write(&path, json).await?;
    Ok(path)
}

/// Writes the summary table to `{dir}/summary_rag_vs_baseline.csv`.
pub fn write_summary(dir: &Path, records: &[ComparisonRecord]) -> EvaluationResult<PathBuf> {
    let path = dir.join(SUMMARY_CSV_FILENAME);
    let mut writer = csv::Writer::from_path(&path)?;
    for record in records {
        writer.serialize(SummaryRow::from(record))?;
    }
    writer.flush()?;
    Ok(path)
}
