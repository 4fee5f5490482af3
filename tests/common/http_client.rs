use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Debug, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

pub struct TestClient {
    http: reqwest::Client,
    base: String,
}

impl TestClient {
    pub fn new(base: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base,
        }
    }

    pub async fn health(&self) -> anyhow::Result<HealthResponse> {
        let response = self
            .http
            .get(format!("{}/health", self.base))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    /// `POST /generate` with a `prompt` field and `(file name, bytes)` uploads.
    pub async fn generate(
        &self,
        prompt: &str,
        files: &[(&str, &[u8])],
    ) -> anyhow::Result<(StatusCode, Value)> {
        let mut form = Form::new().text("prompt", prompt.to_string());
        for (name, data) in files {
            form = form.part("files", Part::bytes(data.to_vec()).file_name(name.to_string()));
        }

        let response = self
            .http
            .post(format!("{}/generate", self.base))
            .multipart(form)
            .send()
            .await?;
        let status = response.status();
        Ok((status, response.json().await?))
    }

    pub async fn rag_query(&self, query: &str) -> anyhow::Result<(StatusCode, Value)> {
        let response = self
            .http
            .post(format!("{}/rag_query", self.base))
            .json(&json!({ "query": query }))
            .send()
            .await?;
        let status = response.status();
        Ok((status, response.json().await?))
    }
}
