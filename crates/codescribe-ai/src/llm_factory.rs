use crate::llm_provider::*;
use codescribe_core::{CodeScribeError, ConfigError, LLMConfig, Result};
use std::sync::Arc;

#[cfg(feature = "openai-llm")]
use crate::openai_llm_provider::{OpenAIConfig, OpenAIProvider};

#[cfg(feature = "openai-compatible")]
use crate::openai_compatible_provider::{OpenAICompatibleConfig, OpenAICompatibleProvider};

/// Factory for creating LLM providers based on configuration
pub struct LLMProviderFactory;

impl LLMProviderFactory {
    /// Create an LLM provider from configuration
    pub fn create_from_config(config: &LLMConfig) -> Result<Arc<dyn LLMProvider>> {
        let provider_name = config.provider.to_lowercase();

        match provider_name.as_str() {
            #[cfg(feature = "openai-llm")]
            "openai" => Self::create_openai_provider(config),
            #[cfg(feature = "openai-compatible")]
            "qwen" | "dashscope" => Self::create_qwen_provider(config),
            #[cfg(feature = "openai-compatible")]
            "openai-compatible" => Self::create_openai_compatible_provider(config),
            _ => Err(Self::unsupported(&provider_name)),
        }
    }

    fn unsupported(provider_name: &str) -> CodeScribeError {
        ConfigError::ValidationError(format!(
            "Unsupported LLM provider: {}. Available providers: {}",
            provider_name,
            Self::supported_providers().join(", ")
        ))
        .into()
    }

    /// Create the OpenAI chat-completion provider
    #[cfg(feature = "openai-llm")]
    fn create_openai_provider(config: &LLMConfig) -> Result<Arc<dyn LLMProvider>> {
        let api_key = config
            .openai_api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| {
                ConfigError::ValidationError(
                    "OpenAI API key not found. Set 'openai_api_key' in config \
                     or OPENAI_API_KEY environment variable"
                        .to_string(),
                )
            })?;

        let defaults = OpenAIConfig::default();
        let openai_config = OpenAIConfig {
            api_key,
            base_url: config.base_url.clone().unwrap_or(defaults.base_url),
            model: config.model.clone().unwrap_or(defaults.model),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout_secs: config.timeout_secs,
            max_retries: config.max_retries,
            organization: defaults.organization,
        };

        Ok(Arc::new(OpenAIProvider::new(openai_config)?))
    }

    /// Create a Qwen provider over DashScope's OpenAI-compatible endpoint
    #[cfg(feature = "openai-compatible")]
    fn create_qwen_provider(config: &LLMConfig) -> Result<Arc<dyn LLMProvider>> {
        let defaults = OpenAICompatibleConfig::qwen(config.dashscope_api_key.clone());
        let qwen_config = OpenAICompatibleConfig {
            base_url: config.base_url.clone().unwrap_or(defaults.base_url),
            model: config.model.clone().unwrap_or(defaults.model),
            timeout_secs: config.timeout_secs,
            max_retries: config.max_retries,
            temperature: Some(config.temperature),
            ..defaults
        };

        Ok(Arc::new(OpenAICompatibleProvider::new(qwen_config)?))
    }

    /// Create an OpenAI-compatible provider
    #[cfg(feature = "openai-compatible")]
    fn create_openai_compatible_provider(config: &LLMConfig) -> Result<Arc<dyn LLMProvider>> {
        let base_url = config.base_url.clone().ok_or_else(|| {
            ConfigError::ValidationError(
                "OpenAI-compatible base URL not found. Set 'base_url' in config".to_string(),
            )
        })?;

        let model = config.model.clone().ok_or_else(|| {
            ConfigError::ValidationError(
                "Model name is required for OpenAI-compatible provider".to_string(),
            )
        })?;

        let compat_config = OpenAICompatibleConfig {
            timeout_secs: config.timeout_secs,
            max_retries: config.max_retries,
            api_key: config.openai_api_key.clone(),
            temperature: Some(config.temperature),
            ..OpenAICompatibleConfig::custom(base_url, model, "openai-compatible".to_string())
        };

        Ok(Arc::new(OpenAICompatibleProvider::new(compat_config)?))
    }

    /// Get a list of supported providers (based on enabled features)
    pub fn supported_providers() -> Vec<&'static str> {
        let mut providers = Vec::new();

        #[cfg(feature = "openai-llm")]
        providers.push("openai");

        #[cfg(feature = "openai-compatible")]
        providers.extend(["qwen", "dashscope", "openai-compatible"]);

        providers
    }
}
