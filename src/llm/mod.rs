//! Text generation backends.
//!
//! Two upstream models are used: Gemini for content analysis and DeepSeek
//! (through its OpenAI-compatible API) for script generation. Both are
//! reached through the [`TextModel`] trait and wrapped in a [`RetryingModel`]
//! that retries transient transport failures.

mod deepseek;
mod gemini;
mod retry;

pub use deepseek::DeepSeekClient;
pub use gemini::GeminiClient;
pub use retry::{RetryPolicy, RetryingModel};

use crate::config::ApiSettings;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// A single-turn completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub prompt: String,
    pub system: Option<String>,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system: None,
            temperature: 0.7,
            max_tokens: None,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Trait for text generation services.
#[async_trait]
pub trait TextModel: Send + Sync {
    /// Provider name used in logs and errors.
    fn provider(&self) -> &str;

    /// Generate text for the request. May return an empty string; callers decide
    /// whether that is acceptable.
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;
}

/// Build the analysis model (Gemini) from settings, wrapped in the retry policy.
pub fn analysis_model(api: &ApiSettings) -> Result<Arc<dyn TextModel>> {
    let (google_key, _) = api.credentials()?;
    let client = GeminiClient::new(google_key, &api.gemini_model)
        .with_base_url(&api.gemini_base_url)
        .with_timeout(api.timeout())?;
    Ok(Arc::new(RetryingModel::new(
        Arc::new(client),
        RetryPolicy::from_settings(api),
    )))
}

/// Build the generation model (DeepSeek) from settings, wrapped in the retry policy.
pub fn generation_model(api: &ApiSettings) -> Result<Arc<dyn TextModel>> {
    let (_, deepseek_key) = api.credentials()?;
    let client = DeepSeekClient::new(
        deepseek_key,
        &api.deepseek_model,
        &api.deepseek_base_url,
        api.timeout(),
    )?;
    Ok(Arc::new(RetryingModel::new(
        Arc::new(client),
        RetryPolicy::from_settings(api),
    )))
}
