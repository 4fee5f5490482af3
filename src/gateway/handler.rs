use axum::{
    Json,
    extract::{
        Multipart, State, multipart::MultipartRejection, rejection::JsonRejection,
    },
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::{Map, Value};
use tracing::{debug, info, instrument};

use crate::constants::{SUPPORT_STATUS_HEADER, SUPPORT_STATUS_OK, SUPPORT_TEST_ID_HEADER};
use crate::gateway::error::GatewayError;
use crate::gateway::payload::{GenerateMetadata, RagQueryRequest};
use crate::gateway::state::HandlerState;
use crate::generation::GenerationRequest;
use crate::job::Attachment;
use crate::rag::RagAnswer;

/// Fields collected from a `/generate` upload before validation.
#[derive(Debug, Default)]
pub(crate) struct GenerateForm {
    pub prompt: Option<String>,
    pub context: Option<Map<String, Value>>,
    pub metadata: Option<GenerateMetadata>,
    pub attachments: Vec<Attachment>,
}

impl GenerateForm {
    /// The `prompt` field wins over `metadata.input.prompt`.
    pub fn into_request(self) -> Result<GenerationRequest, GatewayError> {
        let metadata = self.metadata.unwrap_or_default();

        let prompt = self
            .prompt
            .filter(|p| !p.trim().is_empty())
            .or_else(|| metadata.prompt().map(str::to_string))
            .ok_or_else(|| {
                GatewayError::InvalidRequest(
                    "missing prompt: send a `prompt` field or `metadata.input.prompt`".to_string(),
                )
            })?;

        let context = self
            .context
            .or_else(|| metadata.context().cloned())
            .unwrap_or_default();

        Ok(GenerationRequest {
            prompt,
            attachments: self.attachments,
            context,
            test_id: metadata.test_id,
            model: metadata.model,
            client: metadata.client,
        })
    }
}

pub(crate) async fn read_generate_form(
    multipart: &mut Multipart,
) -> Result<GenerateForm, GatewayError> {
    let mut form = GenerateForm::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "prompt" => form.prompt = Some(field.text().await?),
            "context" => {
                let text = field.text().await?;
                if !text.trim().is_empty() {
                    let context = serde_json::from_str(&text).map_err(|e| {
                        GatewayError::InvalidRequest(format!("context is not a JSON object: {}", e))
                    })?;
                    form.context = Some(context);
                }
            }
            "metadata" => {
                let bytes = field.bytes().await?;
                let metadata = serde_json::from_slice(&bytes).map_err(|e| {
                    GatewayError::InvalidRequest(format!("invalid metadata: {}", e))
                })?;
                form.metadata = Some(metadata);
            }
            "files" | "file" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let data = field.bytes().await?;
                if filename.is_empty() {
                    debug!(bytes = data.len(), "Skipping file part without a name");
                    continue;
                }
                form.attachments.push(Attachment::new(filename, data.to_vec()));
            }
            other => debug!(field = other, "Ignoring unknown multipart field"),
        }
    }

    Ok(form)
}

#[instrument(skip(state, multipart), fields(test_id = tracing::field::Empty))]
pub async fn generate_handler(
    State(state): State<HandlerState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, GatewayError> {
    let mut multipart = multipart.map_err(|e| GatewayError::InvalidRequest(e.body_text()))?;

    let form = read_generate_form(&mut multipart).await?;
    debug!(
        attachments = form.attachments.len(),
        has_metadata = form.metadata.is_some(),
        "Generate request received"
    );
    let request = form.into_request()?;

    let output = state.generation.process(request).await?;
    tracing::Span::current().record("test_id", tracing::field::display(&output.test_id));
    info!("Generation relayed");

    let mut headers = HeaderMap::new();
    headers.insert(
        SUPPORT_STATUS_HEADER,
        HeaderValue::from_static(SUPPORT_STATUS_OK),
    );
    if let Ok(value) = HeaderValue::from_str(&output.test_id) {
        headers.insert(SUPPORT_TEST_ID_HEADER, value);
    }

    Ok((StatusCode::OK, headers, Json(output.result)).into_response())
}

#[instrument(skip(state, payload))]
pub async fn rag_query_handler(
    State(state): State<HandlerState>,
    payload: Result<Json<RagQueryRequest>, JsonRejection>,
) -> Result<Json<RagAnswer>, GatewayError> {
    let Json(request) = payload.map_err(|e| GatewayError::InvalidRequest(e.body_text()))?;

    let rag = state.rag.as_ref().ok_or(GatewayError::RagUnavailable)?;
    let answer = rag.query(&request.query).await?;

    info!(
        latency_seconds = answer.latency_seconds,
        contexts = answer.contexts.len(),
        "RAG query answered"
    );
    Ok(Json(answer))
}
