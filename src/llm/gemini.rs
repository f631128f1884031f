//! Google Gemini client over the `generateContent` REST endpoint.

use super::{CompletionRequest, TextModel};
use crate::error::{PodscriptError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

const PROVIDER: &str = "Gemini";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini client used for content analysis.
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: &str, model: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Point the client at a different API root (e.g., a proxy or a test server).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Rebuild the HTTP client with a per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(self)
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.chars().take(500).collect())
}

#[async_trait]
impl TextModel for GeminiClient {
    fn provider(&self) -> &str {
        PROVIDER
    }

    #[instrument(skip(self, request), fields(model = %self.model, prompt_len = request.prompt.len()))]
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: request.prompt.clone(),
                }],
            }],
            system_instruction: request.system.as_ref().map(|s| Content {
                role: None,
                parts: vec![Part { text: s.clone() }],
            }),
            generation_config: GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
            },
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(PodscriptError::Upstream {
                provider: PROVIDER.to_string(),
                status: Some(status.as_u16()),
                message: error_message(&text),
            });
        }

        let parsed: GenerateContentResponse =
            serde_json::from_str(&text).map_err(|e| PodscriptError::Upstream {
                provider: PROVIDER.to_string(),
                status: None,
                message: format!("unexpected response body: {}", e),
            })?;

        let Some(candidate) = parsed.candidates.into_iter().next() else {
            debug!("Gemini returned no candidates");
            return Ok(String::new());
        };

        let output: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if output.is_empty() {
            debug!(
                "Gemini returned empty content (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("UNKNOWN")
            );
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::State, http::HeaderMap, http::StatusCode, routing::post, Json, Router};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Clone)]
    struct MockState {
        calls: Arc<AtomicUsize>,
        status: StatusCode,
        body: serde_json::Value,
    }

    async fn generate(
        State(state): State<MockState>,
        headers: HeaderMap,
        Json(body): Json<serde_json::Value>,
    ) -> (StatusCode, Json<serde_json::Value>) {
        state.calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(headers.get("x-goog-api-key").unwrap(), "test-key");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "Analyze this");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 256);
        (state.status, Json(state.body.clone()))
    }

    async fn spawn_mock(status: StatusCode, body: serde_json::Value) -> (String, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let state = MockState {
            calls: calls.clone(),
            status,
            body,
        };
        let app = Router::new()
            .route("/models/{model}", post(generate))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}", addr), calls)
    }

    fn request() -> CompletionRequest {
        CompletionRequest::new("Analyze this").with_max_tokens(256)
    }

    #[tokio::test]
    async fn test_complete_joins_parts() {
        let (base, calls) = spawn_mock(
            StatusCode::OK,
            serde_json::json!({
                "candidates": [{
                    "content": {"parts": [{"text": "{\"chapters\":"}, {"text": " []}"}]},
                    "finishReason": "STOP"
                }]
            }),
        )
        .await;

        let client = GeminiClient::new("test-key", "gemini-test").with_base_url(&base);
        let text = client.complete(&request()).await.unwrap();

        assert_eq!(text, "{\"chapters\": []}");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_error_status_maps_to_upstream() {
        let (base, _) = spawn_mock(
            StatusCode::SERVICE_UNAVAILABLE,
            serde_json::json!({"error": {"message": "model overloaded"}}),
        )
        .await;

        let client = GeminiClient::new("test-key", "gemini-test").with_base_url(&base);
        let err = client.complete(&request()).await.unwrap_err();

        match &err {
            PodscriptError::Upstream { status, message, .. } => {
                assert_eq!(*status, Some(503));
                assert_eq!(message, "model overloaded");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_no_candidates_is_empty_text() {
        let (base, _) = spawn_mock(StatusCode::OK, serde_json::json!({"candidates": []})).await;

        let client = GeminiClient::new("test-key", "gemini-test").with_base_url(&base);
        assert_eq!(client.complete(&request()).await.unwrap(), "");
    }

    #[test]
    fn test_endpoint() {
        let client = GeminiClient::new("k", "gemini-2.5-flash").with_base_url("http://localhost:9/v1beta/");
        assert_eq!(
            client.endpoint(),
            "http://localhost:9/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }
}
