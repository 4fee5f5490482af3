//! Bearer tokens for Vertex AI.
//!
//! Tokens come from, in order: a static value (`GOOGLE_ACCESS_TOKEN`), the GCE metadata
//! server, or `gcloud auth print-access-token`. [`TokenChain`] tries each source and caches
//! the first token it gets until shortly before it expires.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Client as HttpClient;
use tokio::process::Command;
use tracing::debug;

use super::error::{VertexError, VertexResult};
use super::model::MetadataToken;

const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";
const METADATA_TIMEOUT: Duration = Duration::from_secs(5);
const GCLOUD_TIMEOUT: Duration = Duration::from_secs(30);
/// `gcloud` does not report a lifetime; tokens are reused for this long.
const GCLOUD_ASSUMED_LIFETIME: Duration = Duration::from_secs(10 * 60);
/// Tokens are refreshed this long before they expire.
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    /// `None` means the token never expires from our point of view.
    pub expires_at: Option<Instant>,
}

impl AccessToken {
    fn is_fresh(&self) -> bool {
        self.expires_at
            .is_none_or(|at| Instant::now() + REFRESH_MARGIN < at)
    }
}

#[async_trait]
/// A source of OAuth bearer tokens.
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self) -> VertexResult<AccessToken>;

    /// Forgets any cached token, e.g. after the API rejected it.
    fn invalidate(&self) {}
}

/// A fixed token.
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn access_token(&self) -> VertexResult<AccessToken> {
        Ok(AccessToken {
            token: self.0.clone(),
            expires_at: None,
        })
    }
}

/// Default service-account token from the GCE metadata server.
pub struct MetadataServerToken {
    http: HttpClient,
    url: String,
}

impl MetadataServerToken {
    pub fn new() -> Self {
        Self::with_url(METADATA_TOKEN_URL)
    }

    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            http: HttpClient::builder()
                .timeout(METADATA_TIMEOUT)
                .build()
                .unwrap_or_else(|_| HttpClient::new()),
            url: url.into(),
        }
    }
}

impl Default for MetadataServerToken {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenProvider for MetadataServerToken {
    async fn access_token(&self) -> VertexResult<AccessToken> {
        let resp = self
            .http
            .get(&self.url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| VertexError::Auth(format!("metadata request failed: {}", e)))?;

        if !resp.status().is_success() {
            return Err(VertexError::Auth(format!(
                "metadata server returned {}",
                resp.status()
            )));
        }

        let token: MetadataToken = resp
            .json()
            .await
            .map_err(|e| VertexError::Auth(format!("invalid metadata token: {}", e)))?;

        Ok(AccessToken {
            token: token.access_token,
            expires_at: token
                .expires_in
                .map(|secs| Instant::now() + Duration::from_secs(secs)),
        })
    }
}

/// Token printed by `gcloud auth print-access-token`.
pub struct GcloudToken {
    gcloud_path: PathBuf,
}

impl GcloudToken {
    /// Uses `gcloud` from `PATH`.
    pub fn new() -> Self {
        Self::with_path("gcloud")
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            gcloud_path: path.into(),
        }
    }
}

impl Default for GcloudToken {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenProvider for GcloudToken {
    async fn access_token(&self) -> VertexResult<AccessToken> {
        let child = Command::new(&self.gcloud_path)
            .args(["auth", "print-access-token"])
            .kill_on_drop(true)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| VertexError::Auth(format!("failed to spawn gcloud: {}", e)))?;

        let output = tokio::time::timeout(GCLOUD_TIMEOUT, child.wait_with_output())
            .await
            .map_err(|_| VertexError::Auth(format!("gcloud timed out after {:?}", GCLOUD_TIMEOUT)))?
            .map_err(|e| VertexError::Auth(format!("failed waiting for gcloud: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(VertexError::Auth(format!("gcloud failed: {}", stderr)));
        }

        let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if token.is_empty() {
            return Err(VertexError::Auth("gcloud printed no token".to_string()));
        }

        Ok(AccessToken {
            token,
            expires_at: Some(Instant::now() + GCLOUD_ASSUMED_LIFETIME),
        })
    }
}

/// Tries each provider in order and caches the first token obtained.
pub struct TokenChain {
    providers: Vec<Arc<dyn TokenProvider>>,
    cached: Mutex<Option<AccessToken>>,
}

impl TokenChain {
    pub fn new(providers: Vec<Arc<dyn TokenProvider>>) -> Self {
        Self {
            providers,
            cached: Mutex::new(None),
        }
    }

    /// Static token when one is configured, otherwise metadata server then `gcloud`.
    pub fn from_static_or_ambient(static_token: Option<String>) -> Self {
        let mut providers: Vec<Arc<dyn TokenProvider>> = Vec::new();
        if let Some(token) = static_token {
            providers.push(Arc::new(StaticToken::new(token)));
        }
        providers.push(Arc::new(MetadataServerToken::new()));
        providers.push(Arc::new(GcloudToken::new()));
        Self::new(providers)
    }

}

#[async_trait]
impl TokenProvider for TokenChain {
    async fn access_token(&self) -> VertexResult<AccessToken> {
        let cached = self.cached.lock().clone().filter(|t| t.is_fresh());
        if let Some(token) = cached {
            return Ok(token);
        }

        let mut failures = Vec::new();
        for provider in &self.providers {
            match provider.access_token().await {
                Ok(token) => {
                    *self.cached.lock() = Some(token.clone());
                    return Ok(token);
                }
                Err(e) => {
                    debug!(error = %e, "Token source unavailable, trying next");
                    failures.push(e.to_string());
                }
            }
        }

        Err(VertexError::Auth(if failures.is_empty() {
            "no token sources configured".to_string()
        } else {
            failures.join("; ")
        }))
    }

    fn invalidate(&self) {
        *self.cached.lock() = None;
    }
}
