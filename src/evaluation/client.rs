use std::time::{Duration, Instant};

use reqwest::multipart::{Form, Part};
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::EvalQuery;
use super::error::EvaluationResult;
use crate::constants::{DEFAULT_CLIENT, DEFAULT_MODEL, round_latency};

/// A response body (or an error stand-in) and the client-side latency in seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct TimedResponse {
    pub data: Value,
    pub latency: f64,
}

/// Talks to a running gateway the way an external caller would.
#[derive(Debug, Clone)]
pub struct EvalClient {
    http: reqwest::Client,
    api_base: String,
}

impl EvalClient {
    pub fn new(api_base: impl Into<String>, timeout: Duration) -> EvaluationResult<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// `POST /generate` with only a `metadata` part, test id `{id}_baseline`.
    pub async fn baseline(&self, query: &EvalQuery) -> TimedResponse {
        let metadata = baseline_metadata(query);
        let url = format!("{}/generate", self.api_base);

        self.timed(|| {
            let part = Part::text(metadata.to_string())
                .mime_str("application/json")
                .unwrap_or_else(|_| Part::text(metadata.to_string()));
            self.http
                .post(&url)
                .multipart(Form::new().part("metadata", part))
        })
        .await
    }

    /// `POST /rag_query` with `{"query": ...}`.
    pub async fn rag(&self, query: &str) -> TimedResponse {
        let url = format!("{}/rag_query", self.api_base);
        self.timed(|| self.http.post(&url).json(&json!({ "query": query })))
            .await
    }

    async fn timed(&self, build: impl FnOnce() -> reqwest::RequestBuilder) -> TimedResponse {
        let started = Instant::now();
        let outcome = match build().send().await {
            Ok(response) => response.text().await,
            Err(e) => Err(e),
        };
        let latency = round_latency(started.elapsed().as_secs_f64());

        let data = match outcome {
            Ok(body) => match serde_json::from_str::<Value>(&body) {
                Ok(value) => value,
                Err(_) => {
                    debug!(bytes = body.len(), "Response body is not JSON");
                    error_value(body)
                }
            },
            Err(e) => {
                warn!(error = %e, "Request failed");
                error_value(e.to_string())
            }
        };

        TimedResponse { data, latency }
    }
}

/// The metadata document sent for a baseline call.
pub fn baseline_metadata(query: &EvalQuery) -> Value {
    json!({
        "test_id": format!("{}_baseline", query.id),
        "input": {"prompt": query.query},
        "model": DEFAULT_MODEL,
        "client": DEFAULT_CLIENT,
    })
}

fn error_value(response: String) -> Value {
    json!({"status": "error", "response": response})
}
