use crate::llm_provider::*;
use async_trait::async_trait;
use codescribe_core::GatewayError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const DASHSCOPE_COMPATIBLE_BASE: &str = "https://dashscope.aliyuncs.com/compatible-mode/v1";
const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// Configuration for OpenAI-compatible providers (Qwen via DashScope, LM Studio, etc.)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAICompatibleConfig {
    /// Base URL for the API (e.g., "http://localhost:1234/v1")
    pub base_url: String,
    /// Model to use
    pub model: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Maximum retries for transient failures
    pub max_retries: u32,
    /// Optional API key (some providers require it, some don't)
    pub api_key: Option<String>,
    /// Provider name for display purposes
    pub provider_name: String,
    /// System message prepended to single-prompt requests
    pub system_prompt: Option<String>,
    /// Sampling temperature; omitted from the request when unset
    pub temperature: Option<f32>,
}

impl Default for OpenAICompatibleConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:1234/v1".to_string(),
            model: "local-model".to_string(),
            timeout_secs: 120,
            max_retries: 0,
            api_key: None,
            provider_name: "openai-compatible".to_string(),
            system_prompt: Some(DEFAULT_SYSTEM_PROMPT.to_string()),
            temperature: None,
        }
    }
}

impl OpenAICompatibleConfig {
    /// Create config for Qwen through DashScope's compatible mode
    pub fn qwen(api_key: Option<String>) -> Self {
        Self {
            base_url: DASHSCOPE_COMPATIBLE_BASE.to_string(),
            model: "qwen-plus".to_string(),
            api_key: api_key.or_else(|| std::env::var("DASHSCOPE_API_KEY").ok()),
            provider_name: "qwen".to_string(),
            ..Default::default()
        }
    }

    /// Create config for custom endpoint
    pub fn custom(base_url: String, model: String, provider_name: String) -> Self {
        Self {
            base_url,
            model,
            provider_name,
            ..Default::default()
        }
    }
}

/// OpenAI-compatible LLM provider speaking plain HTTP JSON
pub struct OpenAICompatibleProvider {
    config: OpenAICompatibleConfig,
    client: Client,
}

impl OpenAICompatibleProvider {
    /// Create a new OpenAI-compatible provider
    pub fn new(config: OpenAICompatibleConfig) -> LLMResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GatewayError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    /// Try a single request using the Chat Completions wire format
    async fn try_request(
        &self,
        messages: &[Message],
        config: &GenerationConfig,
    ) -> LLMResult<LLMResponse> {
        let body = ChatCompletionsRequest {
            model: self.config.model.clone(),
            messages: messages.iter().map(ChatMessage::from).collect(),
            temperature: self.config.temperature,
            max_tokens: config.max_tokens,
            top_p: config.top_p,
            stop: config.stop.clone(),
        };

        let payload = serde_json::to_vec(&body).map_err(|e| {
            GatewayError::Transport(format!("Failed to marshal request body: {}", e))
        })?;

        let mut request_builder = self
            .client
            .post(self.endpoint())
            .header("Content-Type", "application/json")
            .body(payload);

        if let Some(api_key) = &self.config.api_key {
            request_builder =
                request_builder.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = request_builder
            .send()
            .await
            .map_err(|e| send_error(e, Duration::from_secs(self.config.timeout_secs)))?;

        let status = response.status();
        let body_text = response.text().await.map_err(|e| {
            GatewayError::Transport(format!("Failed to read response body: {}", e))
        })?;

        if !status.is_success() {
            return Err(GatewayError::from_status(
                status.as_u16(),
                format!("{} API error: {}", self.config.provider_name, body_text),
            ));
        }

        let chat_response: ChatCompletionsResponse =
            serde_json::from_str(&body_text).map_err(|e| {
                GatewayError::InvalidResponse(format!(
                    "Failed to unmarshal {} response body: {}",
                    self.config.provider_name, e
                ))
            })?;

        chat_response.into_llm_response(&self.config.model)
    }
}

#[async_trait]
impl LLMProvider for OpenAICompatibleProvider {
    async fn generate(&self, prompt: &str) -> LLMResult<LLMResponse> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &self.config.system_prompt {
            messages.push(Message::system(system.clone()));
        }
        messages.push(Message::user(prompt));
        self.generate_chat(&messages, &GenerationConfig::default())
            .await
    }

    async fn generate_chat(
        &self,
        messages: &[Message],
        config: &GenerationConfig,
    ) -> LLMResult<LLMResponse> {
        debug!(
            "Sending {} message(s) to {} at {}",
            messages.len(),
            self.config.provider_name,
            self.config.base_url
        );
        with_retries(&self.config.provider_name, self.config.max_retries, || {
            self.try_request(messages, config)
        })
        .await
    }

    async fn is_available(&self) -> bool {
        let result = self
            .client
            .get(format!("{}/models", self.config.base_url.trim_end_matches('/')))
            .send()
            .await;

        result.is_ok()
    }

    fn provider_name(&self) -> &str {
        &self.config.provider_name
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
