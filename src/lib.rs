//! Gemini support backend library (used by the server, the evaluation tool and integration
//! tests).
//!
//! # Public API Surface
//!
//! ## Prompt relay
//! - [`GenerationService`], [`GenerationRequest`] - run a prompt through the external test runner
//! - [`TestRunner`], [`ProcessRunner`] - runner seam and its process-backed implementation
//! - [`JobDescription`], [`JobInput`], [`MediaKind`] - job files handed to the runner
//!
//! ## Grounded answers
//! - [`RagService`], [`RagAnswer`] - retrieve, prompt, generate, trace
//! - [`RagBackend`], [`VertexClient`], [`TokenChain`] - Vertex AI REST binding
//!
//! ## Surfaces
//! - [`gateway`] - Axum router for `/health`, `/generate`, `/rag_query`
//! - [`evaluation`] - baseline vs RAG comparison against a running gateway
//!
//! ## Test/Mock Support
//! Mock implementations are available behind `#[cfg(any(test, feature = "mock"))]`.

pub mod config;
pub mod constants;
pub mod evaluation;
pub mod gateway;
pub mod generation;
pub mod job;
pub mod rag;
pub mod runner;
pub mod vertex;

pub use config::{Config, ConfigError, RunnerConfig, VertexSettings};
pub use evaluation::{ComparisonRecord, EvalClient, EvalQuery, Evaluation, EvaluationError};
pub use gateway::{GatewayError, HandlerState, create_router_with_config, create_router_with_state};
pub use generation::{GenerationError, GenerationOutput, GenerationRequest, GenerationService};
pub use job::{Attachment, JobDescription, JobInput, MediaKind};
pub use rag::{ContextEntry, RagAnswer, RagError, RagService, RagTrace};
#[cfg(any(test, feature = "mock"))]
pub use runner::MockTestRunner;
pub use runner::{ProcessRunner, RunOutcome, RunnerError, TestRunner};
#[cfg(any(test, feature = "mock"))]
pub use vertex::MockRagBackend;
pub use vertex::{RagBackend, RetrievedContext, TokenChain, VertexClient, VertexError};
