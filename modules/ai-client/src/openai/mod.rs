mod client;
pub(crate) mod types;

use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use crate::error::AiError;
use crate::traits::{GenerationRequest, TextGenerator};

use client::OpenAiClient;

/// Default per-request timeout for chat completions.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

// =============================================================================
// OpenAi Generator
// =============================================================================

#[derive(Clone)]
pub struct OpenAi {
    api_key: String,
    pub(crate) model: String,
    base_url: Option<String>,
    timeout: Duration,
}

impl OpenAi {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Build from `OPENAI_API_KEY` and an optional `OPENAI_BASE_URL`.
    pub fn from_env(model: impl Into<String>) -> Result<Self, AiError> {
        Self::from_vars(
            std::env::var("OPENAI_API_KEY").ok(),
            std::env::var("OPENAI_BASE_URL").ok(),
            model,
        )
    }

    fn from_vars(
        api_key: Option<String>,
        base_url: Option<String>,
        model: impl Into<String>,
    ) -> Result<Self, AiError> {
        let api_key = api_key
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| AiError::Config("OPENAI_API_KEY environment variable not set".into()))?;
        let ai = Self::new(api_key, model);
        Ok(match base_url.filter(|url| !url.trim().is_empty()) {
            Some(url) => ai.with_base_url(url),
            None => ai,
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn client(&self) -> Result<OpenAiClient, AiError> {
        let client = OpenAiClient::new(&self.api_key, self.timeout)?;
        Ok(match self.base_url {
            Some(ref url) => client.with_base_url(url),
            None => client,
        })
    }
}

#[async_trait]
impl TextGenerator for OpenAi {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, AiError> {
        let temperature = request
            .temperature
            .filter(|_| types::supports_temperature(&self.model));
        let chat = types::ChatRequest::new(&self.model)
            .messages(&request.messages)
            .temperature(temperature);

        let response = self.client()?.chat(&chat).await?;

        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or(AiError::EmptyResponse)?;

        info!(model = %self.model, chars = text.len(), "OpenAI completion received");
        Ok(text)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
