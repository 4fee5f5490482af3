use super::model::*;
use super::*;
use crate::config::VertexSettings;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
};
use serde_json::{Value, json};
use tokio::net::TcpListener;

fn settings() -> VertexSettings {
    VertexSettings {
        project_id: "acme-support".to_string(),
        location: "europe-west3".to_string(),
        rag_corpus: "projects/acme-support/locations/europe-west3/ragCorpora/7".to_string(),
        generation_model: "gemini-2.5-flash".to_string(),
        top_k: Some(3),
    }
}

async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

mod model_tests {
    use super::*;

    #[test]
    fn test_retrieve_request_shape() {
        let request = RetrieveContextsRequest {
            vertex_rag_store: VertexRagStore {
                rag_resources: vec![RagResource {
                    rag_corpus: "corpus-1".to_string(),
                }],
            },
            query: RagQuery {
                text: "Gasleck?".to_string(),
                rag_retrieval_config: None,
            },
        };

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "vertexRagStore": {"ragResources": [{"ragCorpus": "corpus-1"}]},
                "query": {"text": "Gasleck?"}
            })
        );
    }

    #[test]
    fn test_retrieve_response_parsing_tolerates_missing_fields() {
        let raw = json!({
            "contexts": {
                "contexts": [
                    {"sourceUri": "gs://b/a.pdf", "text": "alpha", "score": 0.8},
                    {"text": "beta"},
                    {}
                ]
            }
        });
        let parsed: RetrieveContextsResponse = serde_json::from_value(raw).unwrap();

        let contexts = parsed.contexts.contexts;
        assert_eq!(contexts.len(), 3);
        assert_eq!(contexts[0].source_uri.as_deref(), Some("gs://b/a.pdf"));
        assert_eq!(contexts[1].source_uri, None);
        assert_eq!(contexts[2].text, "");

        let empty: RetrieveContextsResponse = serde_json::from_value(json!({})).unwrap();
        assert!(empty.contexts.contexts.is_empty());
    }

    #[test]
    fn test_generate_response_text_joins_parts() {
        let raw = json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Erst "}, {"text": "räumen."}]},
                "finishReason": "STOP"
            }]
        });
        let parsed: GenerateContentResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(parsed.text().as_deref(), Some("Erst räumen."));

        let blocked: GenerateContentResponse =
            serde_json::from_value(json!({"candidates": []})).unwrap();
        assert_eq!(blocked.text(), None);
    }
}

mod client_tests {
    use super::*;

    #[derive(Clone, Default)]
    struct Seen {
        bodies: Arc<parking_lot::Mutex<Vec<(String, Value)>>>,
    }

    fn authorized(headers: &HeaderMap) -> bool {
        headers.get("authorization").and_then(|v| v.to_str().ok()) == Some("Bearer test-token")
    }

    fn fake_vertex(seen: Seen) -> Router {
        Router::new()
            .route(
                "/projects/acme-support/locations/europe-west3:retrieveContexts",
                post(
                    |State(seen): State<Seen>, headers: HeaderMap, Json(body): Json<Value>| async move {
                        if !authorized(&headers) {
                            return (StatusCode::UNAUTHORIZED, Json(json!({}))).into_response();
                        }
                        seen.bodies.lock().push(("retrieve".to_string(), body));
                        Json(json!({
                            "contexts": {"contexts": [
                                {"sourceUri": "gs://corpus/sop.pdf", "text": "Bereich räumen.", "score": 0.9}
                            ]}
                        }))
                        .into_response()
                    },
                ),
            )
            .route(
                "/projects/acme-support/locations/europe-west3/publishers/google/models/gemini-2.5-flash:generateContent",
                post(
                    |State(seen): State<Seen>, headers: HeaderMap, Json(body): Json<Value>| async move {
                        if !authorized(&headers) {
                            return (StatusCode::UNAUTHORIZED, Json(json!({}))).into_response();
                        }
                        seen.bodies.lock().push(("generate".to_string(), body));
                        Json(json!({
                            "candidates": [{"content": {"parts": [{"text": "Sofort räumen."}]}}]
                        }))
                        .into_response()
                    },
                ),
            )
            .with_state(seen)
    }

    use axum::response::IntoResponse;

    #[test]
    fn test_default_urls() {
        let client = VertexClient::new(settings(), Arc::new(StaticToken::new("t")));

        assert_eq!(
            client.retrieve_contexts_url(),
            "https://europe-west3-aiplatform.googleapis.com/v1/projects/acme-support/locations/europe-west3:retrieveContexts"
        );
        assert_eq!(
            client.generate_content_url(),
            "https://europe-west3-aiplatform.googleapis.com/v1/projects/acme-support/locations/europe-west3/publishers/google/models/gemini-2.5-flash:generateContent"
        );
    }

    #[tokio::test]
    async fn test_retrieve_and_generate_against_fake_service() {
        let seen = Seen::default();
        let base = serve(fake_vertex(seen.clone())).await;
        let client = VertexClient::new(settings(), Arc::new(StaticToken::new("test-token")))
            .with_base_url(format!("{}/", base));

        let contexts = client.retrieve_contexts("Gasleck?").await.unwrap();
        assert_eq!(
            contexts,
            vec![RetrievedContext {
                source_uri: Some("gs://corpus/sop.pdf".to_string()),
                text: "Bereich räumen.".to_string(),
                score: Some(0.9),
            }]
        );

        let text = client.generate_content("Frage: Gasleck?").await.unwrap();
        assert_eq!(text, "Sofort räumen.");

        let bodies = seen.bodies.lock().clone();
        assert_eq!(bodies[0].0, "retrieve");
        assert_eq!(
            bodies[0].1["vertexRagStore"]["ragResources"][0]["ragCorpus"],
            "projects/acme-support/locations/europe-west3/ragCorpora/7"
        );
        assert_eq!(bodies[0].1["query"]["ragRetrievalConfig"]["topK"], 3);
        assert_eq!(bodies[1].0, "generate");
        assert_eq!(bodies[1].1["contents"][0]["role"], "user");
        assert_eq!(bodies[1].1["contents"][0]["parts"][0]["text"], "Frage: Gasleck?");
    }

    #[tokio::test]
    async fn test_api_error_carries_status_and_body() {
        let base = serve(fake_vertex(Seen::default())).await;
        let client = VertexClient::new(settings(), Arc::new(StaticToken::new("wrong")))
            .with_base_url(base);

        let err = client.retrieve_contexts("x").await.unwrap_err();

        match err {
            VertexError::Api { status, .. } => assert_eq!(status, 401),
            other => panic!("expected Api error, got {:?}", other),
        }
    }
}

mod auth_tests {
    use super::*;
    use async_trait::async_trait;

    struct Counting {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl TokenProvider for Counting {
        async fn access_token(&self) -> VertexResult<AccessToken> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(VertexError::Auth("unavailable".to_string()))
            } else {
                Ok(AccessToken {
                    token: "from-counting".to_string(),
                    expires_at: None,
                })
            }
        }
    }

    #[tokio::test]
    async fn test_chain_falls_through_and_caches() {
        let failing = Arc::new(Counting {
            calls: AtomicUsize::new(0),
            fail: true,
        });
        let working = Arc::new(Counting {
            calls: AtomicUsize::new(0),
            fail: false,
        });
        let chain = TokenChain::new(vec![failing.clone(), working.clone()]);

        assert_eq!(chain.access_token().await.unwrap().token, "from-counting");
        assert_eq!(chain.access_token().await.unwrap().token, "from-counting");
        assert_eq!(failing.calls.load(Ordering::SeqCst), 1);
        assert_eq!(working.calls.load(Ordering::SeqCst), 1);

        chain.invalidate();
        chain.access_token().await.unwrap();
        assert_eq!(working.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_chain_reports_all_failures() {
        let chain = TokenChain::new(vec![
            Arc::new(Counting {
                calls: AtomicUsize::new(0),
                fail: true,
            }),
            Arc::new(GcloudToken::with_path("/definitely/not/gcloud")),
        ]);

        match chain.access_token().await.unwrap_err() {
            VertexError::Auth(msg) => {
                assert!(msg.contains("unavailable"));
                assert!(msg.contains("gcloud"));
            }
            other => panic!("expected Auth error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_static_token_comes_first() {
        let chain = TokenChain::from_static_or_ambient(Some("static-abc".to_string()));
        assert_eq!(chain.access_token().await.unwrap().token, "static-abc");
    }

    #[tokio::test]
    async fn test_metadata_token_from_fake_server() {
        let router = Router::new().route(
            "/token",
            get(|headers: HeaderMap| async move {
                if headers.get("metadata-flavor").and_then(|v| v.to_str().ok()) != Some("Google") {
                    return (StatusCode::FORBIDDEN, Json(json!({})));
                }
                (
                    StatusCode::OK,
                    Json(json!({"access_token": "meta-123", "expires_in": 3599, "token_type": "Bearer"})),
                )
            }),
        );
        let base = serve(router).await;

        let token = MetadataServerToken::with_url(format!("{}/token", base))
            .access_token()
            .await
            .unwrap();

        assert_eq!(token.token, "meta-123");
        assert!(token.expires_at.is_some());
    }
}
