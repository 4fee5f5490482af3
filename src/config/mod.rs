//! Environment-backed configuration.
//!
//! Every server setting has a default. Override with `SUPPORT_*` environment variables;
//! the Vertex AI settings keep their `GCP_*` / `VERTEX_*` names.

pub mod error;


pub use error::ConfigError;

use std::env;
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{DEFAULT_CLIENT, DEFAULT_GCP_LOCATION, DEFAULT_MODEL, DEFAULT_RESULTS_DIR};

/// Server configuration loaded from environment variables.
///
/// Use [`Config::from_env`] to read overrides on top of defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port. Default: `8000`.
    pub port: u16,

    /// IP address to bind to. Default: `127.0.0.1`.
    pub bind_addr: IpAddr,

    /// Directory the runner writes results into. RAG traces land here too. Default: `./results`.
    pub results_dir: PathBuf,

    /// How the external test runner is invoked.
    pub runner: RunnerConfig,

    /// Model written into job files. Default: `gemini-2.5-flash`.
    pub default_model: String,

    /// Client name written into job files. Default: `gemini`.
    pub default_client: String,

    /// Maximum accepted request body size in bytes. Default: 50 MiB.
    pub max_upload_bytes: usize,

    /// Allowed CORS origins. Empty means any origin.
    pub cors_origins: Vec<String>,

    /// Vertex AI project. Required for the RAG backend.
    pub gcp_project_id: Option<String>,

    /// Vertex AI region. Default: `europe-west3`.
    pub gcp_location: String,

    /// Full RAG corpus resource name. Required for the RAG backend.
    pub rag_corpus: Option<String>,

    /// Model used for grounded generation. Default: `gemini-2.5-flash`.
    pub generation_model: String,

    /// Optional retrieval top-k. The service default applies when unset.
    pub rag_top_k: Option<u32>,

    /// Static bearer token. When unset the metadata server and `gcloud` are tried.
    pub access_token: Option<String>,
}

/// Invocation of the external test runner: `program args... <job file>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    pub program: String,
    pub args: Vec<String>,
    pub timeout: Duration,
    /// Maximum number of jobs running at once.
    pub concurrency: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            program: "python".to_string(),
            args: vec!["-m".to_string(), "lib.test_runner".to_string()],
            timeout: Duration::from_secs(600),
            concurrency: 1,
        }
    }
}

/// Settings needed to talk to Vertex AI, split out once both required values are known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexSettings {
    pub project_id: String,
    pub location: String,
    pub rag_corpus: String,
    pub generation_model: String,
    pub top_k: Option<u32>,
}

/// Default upload limit (50 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8000,
            bind_addr: IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)),
            results_dir: PathBuf::from(DEFAULT_RESULTS_DIR),
            runner: RunnerConfig::default(),
            default_model: DEFAULT_MODEL.to_string(),
            default_client: DEFAULT_CLIENT.to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            cors_origins: Vec::new(),
            gcp_project_id: None,
            gcp_location: DEFAULT_GCP_LOCATION.to_string(),
            rag_corpus: None,
            generation_model: DEFAULT_MODEL.to_string(),
            rag_top_k: None,
            access_token: None,
        }
    }
}

impl Config {
    const ENV_PORT: &'static str = "SUPPORT_PORT";
    const ENV_BIND_ADDR: &'static str = "SUPPORT_BIND_ADDR";
    const ENV_RESULTS_DIR: &'static str = "SUPPORT_RESULTS_DIR";
    const ENV_RUNNER_PROGRAM: &'static str = "SUPPORT_RUNNER_PROGRAM";
    const ENV_RUNNER_ARGS: &'static str = "SUPPORT_RUNNER_ARGS";
    const ENV_RUNNER_TIMEOUT_SECS: &'static str = "SUPPORT_RUNNER_TIMEOUT_SECS";
    const ENV_RUNNER_CONCURRENCY: &'static str = "SUPPORT_RUNNER_CONCURRENCY";
    const ENV_DEFAULT_MODEL: &'static str = "SUPPORT_DEFAULT_MODEL";
    const ENV_DEFAULT_CLIENT: &'static str = "SUPPORT_DEFAULT_CLIENT";
    const ENV_MAX_UPLOAD_BYTES: &'static str = "SUPPORT_MAX_UPLOAD_BYTES";
    const ENV_CORS_ORIGINS: &'static str = "SUPPORT_CORS_ORIGINS";
    const ENV_GCP_PROJECT_ID: &'static str = "GCP_PROJECT_ID";
    const ENV_GCP_LOCATION: &'static str = "GCP_LOCATION";
    const ENV_RAG_CORPUS: &'static str = "VERTEX_RAG_CORPUS";
    const ENV_GENERATION_MODEL: &'static str = "VERTEX_GENERATION_MODEL";
    const ENV_RAG_TOP_K: &'static str = "VERTEX_RAG_TOP_K";
    const ENV_ACCESS_TOKEN: &'static str = "GOOGLE_ACCESS_TOKEN";

    /// Loads configuration from environment variables (falling back to defaults).
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let port = Self::parse_port_from_env(defaults.port)?;
        let bind_addr = Self::parse_bind_addr_from_env(defaults.bind_addr)?;
        let results_dir = Self::parse_path_from_env(Self::ENV_RESULTS_DIR, defaults.results_dir);

        let runner = RunnerConfig {
            program: Self::parse_string_from_env(
                Self::ENV_RUNNER_PROGRAM,
                defaults.runner.program,
            ),
            args: env::var(Self::ENV_RUNNER_ARGS)
                .map(|v| v.split_whitespace().map(str::to_string).collect())
                .unwrap_or(defaults.runner.args),
            timeout: Duration::from_secs(Self::parse_u64_from_env(
                Self::ENV_RUNNER_TIMEOUT_SECS,
                defaults.runner.timeout.as_secs(),
            )?),
            concurrency: Self::parse_u64_from_env(
                Self::ENV_RUNNER_CONCURRENCY,
                defaults.runner.concurrency as u64,
            )? as usize,
        };

        let default_model =
            Self::parse_string_from_env(Self::ENV_DEFAULT_MODEL, defaults.default_model);
        let default_client =
            Self::parse_string_from_env(Self::ENV_DEFAULT_CLIENT, defaults.default_client);
        let max_upload_bytes = Self::parse_u64_from_env(
            Self::ENV_MAX_UPLOAD_BYTES,
            defaults.max_upload_bytes as u64,
        )? as usize;
        let cors_origins = env::var(Self::ENV_CORS_ORIGINS)
            .map(|v| parse_origins(&v))
            .unwrap_or(defaults.cors_origins);

        let gcp_project_id = Self::parse_optional_string_from_env(Self::ENV_GCP_PROJECT_ID);
        let gcp_location =
            Self::parse_string_from_env(Self::ENV_GCP_LOCATION, defaults.gcp_location);
        let rag_corpus = Self::parse_optional_string_from_env(Self::ENV_RAG_CORPUS);
        let generation_model =
            Self::parse_string_from_env(Self::ENV_GENERATION_MODEL, defaults.generation_model);
        let rag_top_k = match Self::parse_optional_string_from_env(Self::ENV_RAG_TOP_K) {
            Some(value) => Some(value.parse().map_err(|e: std::num::ParseIntError| {
                ConfigError::InvalidNumber {
                    name: Self::ENV_RAG_TOP_K,
                    value: value.clone(),
                    reason: e.to_string(),
                }
            })?),
            None => None,
        };
        let access_token = Self::parse_optional_string_from_env(Self::ENV_ACCESS_TOKEN);

        Ok(Self {
            port,
            bind_addr,
            results_dir,
            runner,
            default_model,
            default_client,
            max_upload_bytes,
            cors_origins,
            gcp_project_id,
            gcp_location,
            rag_corpus,
            generation_model,
            rag_top_k,
            access_token,
        })
    }

    /// Validates paths and basic invariants (does not create directories).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.results_dir.exists() && !self.results_dir.is_dir() {
            return Err(ConfigError::NotADirectory {
                path: self.results_dir.clone(),
            });
        }

        if self.runner.program.trim().is_empty() {
            return Err(ConfigError::EmptyRunnerProgram);
        }

        if self.runner.concurrency == 0 {
            return Err(ConfigError::InvalidNumber {
                name: Self::ENV_RUNNER_CONCURRENCY,
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        if self.runner.timeout.is_zero() {
            return Err(ConfigError::InvalidNumber {
                name: Self::ENV_RUNNER_TIMEOUT_SECS,
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(())
    }

    /// Returns `"{bind_addr}:{port}"` (useful for logging/binding).
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    /// Returns the Vertex AI settings, or the first missing required variable.
    pub fn vertex(&self) -> Result<VertexSettings, ConfigError> {
        let project_id = self
            .gcp_project_id
            .clone()
            .ok_or(ConfigError::MissingEnvVar {
                name: Self::ENV_GCP_PROJECT_ID,
            })?;
        let rag_corpus = self.rag_corpus.clone().ok_or(ConfigError::MissingEnvVar {
            name: Self::ENV_RAG_CORPUS,
        })?;

        Ok(VertexSettings {
            project_id,
            location: self.gcp_location.clone(),
            rag_corpus,
            generation_model: self.generation_model.clone(),
            top_k: self.rag_top_k,
        })
    }

    fn parse_port_from_env(default: u16) -> Result<u16, ConfigError> {
        match env::var(Self::ENV_PORT) {
            Ok(value) => {
                let port: u16 = value.parse().map_err(|e| ConfigError::PortParseError {
                    value: value.clone(),
                    source: e,
                })?;

                if port == 0 {
                    return Err(ConfigError::InvalidPort { value });
                }

                Ok(port)
            }
            Err(_) => Ok(default),
        }
    }

    fn parse_bind_addr_from_env(default: IpAddr) -> Result<IpAddr, ConfigError> {
        match env::var(Self::ENV_BIND_ADDR) {
            Ok(value) => value
                .parse()
                .map_err(|e| ConfigError::InvalidBindAddr { value, source: e }),
            Err(_) => Ok(default),
        }
    }

    fn parse_path_from_env(var_name: &str, default: PathBuf) -> PathBuf {
        env::var(var_name).map(PathBuf::from).unwrap_or(default)
    }

    fn parse_string_from_env(var_name: &str, default: String) -> String {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(default)
    }

    fn parse_optional_string_from_env(var_name: &str) -> Option<String> {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse_u64_from_env(var_name: &'static str, default: u64) -> Result<u64, ConfigError> {
        match env::var(var_name) {
            Ok(value) => value
                .trim()
                .parse()
                .map_err(|e: std::num::ParseIntError| ConfigError::InvalidNumber {
                    name: var_name,
                    value: value.clone(),
                    reason: e.to_string(),
                }),
            Err(_) => Ok(default),
        }
    }
}

/// Splits a comma separated origin list. `*` (or nothing) means any origin.
fn parse_origins(raw: &str) -> Vec<String> {
    let origins: Vec<String> = raw
        .split(',')
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
        .collect();

    if origins.iter().any(|o| o == "*") {
        Vec::new()
    } else {
        origins
    }
}
