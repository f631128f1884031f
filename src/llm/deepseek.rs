//! DeepSeek client over its OpenAI-compatible chat completions API.
//!
//! Requests and responses use the `async-openai` wire types; the call itself
//! goes through reqwest so the HTTP status is kept for retry decisions.

use super::{CompletionRequest, TextModel};
use crate::error::{PodscriptError, Result};
use async_openai::error::OpenAIError;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequest,
    CreateChatCompletionRequestArgs, CreateChatCompletionResponse,
};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

const PROVIDER: &str = "DeepSeek";

/// DeepSeek client used for script generation.
pub struct DeepSeekClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl DeepSeekClient {
    /// Create a client with the given credentials, API root and per-request timeout.
    pub fn new(api_key: &str, model: &str, base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::builder().timeout(timeout).build()?,
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn build_request(&self, request: &CompletionRequest) -> Result<CreateChatCompletionRequest> {
        let mut messages: Vec<ChatCompletionRequestMessage> = Vec::with_capacity(2);

        if let Some(system) = &request.system {
            messages.push(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(system.clone())
                    .build()
                    .map_err(map_openai_error)?
                    .into(),
            );
        }

        messages.push(
            ChatCompletionRequestUserMessageArgs::default()
                .content(request.prompt.clone())
                .build()
                .map_err(map_openai_error)?
                .into(),
        );

        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&self.model)
            .messages(messages)
            .temperature(request.temperature);

        if let Some(max_tokens) = request.max_tokens {
            #[allow(deprecated)]
            args.max_tokens(max_tokens);
        }

        args.build().map_err(map_openai_error)
    }
}

fn map_openai_error(e: OpenAIError) -> PodscriptError {
    PodscriptError::Upstream {
        provider: PROVIDER.to_string(),
        status: None,
        message: e.to_string(),
    }
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
impl TextModel for DeepSeekClient {
    fn provider(&self) -> &str {
        PROVIDER
    }

    #[instrument(skip(self, request), fields(model = %self.model, prompt_len = request.prompt.len()))]
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let chat_request = self.build_request(request)?;

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&chat_request)
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

        let parsed: CreateChatCompletionResponse =
            serde_json::from_str(&text).map_err(|e| PodscriptError::Upstream {
                provider: PROVIDER.to_string(),
                status: None,
                message: format!("unexpected response body: {}", e),
            })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        debug!("DeepSeek returned {} characters", content.len());
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{RetryPolicy, RetryingModel};
    use axum::{extract::State, http::HeaderMap, http::StatusCode, routing::post, Json, Router};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Clone)]
    struct MockState {
        calls: Arc<AtomicUsize>,
        status: StatusCode,
        body: serde_json::Value,
    }

    async fn chat(
        State(state): State<MockState>,
        headers: HeaderMap,
        Json(body): Json<serde_json::Value>,
    ) -> (StatusCode, Json<serde_json::Value>) {
        state.calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(headers.get("authorization").unwrap(), "Bearer sk-test");
        assert_eq!(body["model"], "deepseek-chat");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "Write a script");
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
            .route("/chat/completions", post(chat))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}/", addr), calls)
    }

    fn client_for(base_url: &str) -> DeepSeekClient {
        DeepSeekClient::new("sk-test", "deepseek-chat", base_url, Duration::from_secs(5)).unwrap()
    }

    fn request() -> CompletionRequest {
        CompletionRequest::new("Write a script").with_system("You are a podcast writer")
    }

    #[tokio::test]
    async fn test_complete_returns_first_choice() {
        let (base, calls) = spawn_mock(
            StatusCode::OK,
            serde_json::json!({
                "id": "chatcmpl-1",
                "object": "chat.completion",
                "created": 1,
                "model": "deepseek-chat",
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": "Welcome back to Brew Talk."},
                    "finish_reason": "stop"
                }]
            }),
        )
        .await;

        let text = client_for(&base).complete(&request()).await.unwrap();
        assert_eq!(text, "Welcome back to Brew Talk.");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_server_errors_are_retried() {
        let (base, calls) = spawn_mock(
            StatusCode::SERVICE_UNAVAILABLE,
            serde_json::json!({"error": {"message": "overloaded", "type": "server_error"}}),
        )
        .await;

        let model = RetryingModel::new(
            Arc::new(client_for(&base)),
            RetryPolicy {
                max_retries: 2,
                base_delay: Duration::from_millis(1),
            },
        );
        let err = model.complete(&request()).await.unwrap_err();

        match &err {
            PodscriptError::Upstream { status, message, .. } => {
                assert_eq!(*status, Some(503));
                assert_eq!(message, "overloaded");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.is_transient());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_auth_errors_are_not_retried() {
        let (base, calls) = spawn_mock(
            StatusCode::UNAUTHORIZED,
            serde_json::json!({"error": {"message": "invalid api key"}}),
        )
        .await;

        let model = RetryingModel::new(Arc::new(client_for(&base)), RetryPolicy::default());
        let err = model.complete(&request()).await.unwrap_err();

        assert!(!err.is_transient());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_build_request_with_system() {
        let request = request().with_temperature(0.8).with_max_tokens(1024);

        let built = client_for("https://api.deepseek.com/").build_request(&request).unwrap();
        assert_eq!(built.model, "deepseek-chat");
        assert_eq!(built.messages.len(), 2);
        assert_eq!(built.temperature, Some(0.8));
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        assert_eq!(
            client_for("https://api.deepseek.com/").endpoint(),
            "https://api.deepseek.com/chat/completions"
        );
    }
}
