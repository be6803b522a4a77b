use crate::types::FileFailurePolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Failed to read config: {0}")]
    ReadError(String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main configuration for CodeScribe
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CodeScribeConfig {
    /// Model backend configuration
    #[serde(default)]
    pub llm: LLMConfig,

    /// Answer pipeline behaviour
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// LLM backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    /// Provider: "openai", "qwen" (alias "dashscope") or "openai-compatible"
    #[serde(default = "default_llm_provider")]
    pub provider: String,

    /// Model identifier
    /// For OpenAI: e.g. "gpt-4o-mini"
    /// For Qwen/DashScope: e.g. "qwen-plus"
    /// For OpenAI-compatible: whatever the endpoint serves
    #[serde(default)]
    pub model: Option<String>,

    /// Base URL override (e.g. "https://api.chatanywhere.tech/v1")
    #[serde(default)]
    pub base_url: Option<String>,

    /// OpenAI API key
    #[serde(default)]
    pub openai_api_key: Option<String>,

    /// DashScope API key (Qwen compatible mode)
    #[serde(default)]
    pub dashscope_api_key: Option<String>,

    /// Sampling temperature
    #[serde(default)]
    pub temperature: f32,

    /// Maximum tokens to generate; the backend default applies when unset
    #[serde(default)]
    pub max_tokens: Option<usize>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries for transient gateway failures (0 = fail on first error)
    #[serde(default)]
    pub max_retries: u32,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            model: None,
            base_url: None,
            openai_api_key: None,
            dashscope_api_key: None,
            temperature: 0.0,
            max_tokens: None,
            timeout_secs: default_timeout_secs(),
            max_retries: 0,
        }
    }
}

/// Answer pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Per-file analyses in flight at once (1 = strictly sequential)
    #[serde(default = "default_max_concurrent_analyses")]
    pub max_concurrent_analyses: usize,

    /// "abort" or "skip"
    #[serde(default = "default_on_file_error")]
    pub on_file_error: String,

    /// Append-only trace of intermediate artifacts (JSONL)
    #[serde(default)]
    pub trace_log_path: Option<PathBuf>,

    /// Extra context handed to the synthesis prompt
    #[serde(default)]
    pub help_info: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_analyses: default_max_concurrent_analyses(),
            on_file_error: default_on_file_error(),
            trace_log_path: None,
            help_info: None,
        }
    }
}

impl PipelineConfig {
    /// Parsed failure policy; falls back to abort on an unknown value
    pub fn failure_policy(&self) -> FileFailurePolicy {
        self.on_file_error.parse().unwrap_or_default()
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "pretty" or "compact"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// Default value functions
fn default_llm_provider() -> String {
    "openai".to_string()
}
fn default_timeout_secs() -> u64 {
    120
}
fn default_max_concurrent_analyses() -> usize {
    1
}
fn default_on_file_error() -> String {
    "abort".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "pretty".to_string()
}

/// Configuration manager with layered sources
pub struct ConfigManager {
    config: CodeScribeConfig,
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Load configuration with the following precedence:
    /// 1. Environment variables (.env file)
    /// 2. Config file (explicit path, ./.codescribe.toml, ~/.codescribe/config.toml)
    /// 3. Sensible defaults
    pub fn load(explicit_path: Option<&Path>) -> Result<Self, ConfigError> {
        info!("🔧 Loading CodeScribe configuration...");

        Self::load_dotenv();

        let (config, config_path) = match explicit_path {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound(path.display().to_string()));
                }
                (Self::read_toml_file(path)?, Some(path.to_path_buf()))
            }
            None => Self::load_config_file()?,
        };

        let config = Self::normalize(Self::apply_env_overrides(config));

        Self::validate_config(&config)?;

        info!("✅ Configuration loaded");
        match config_path {
            Some(ref path) => info!("   📄 Config file: {}", path.display()),
            None => info!("   📄 Config file: NONE (using defaults)"),
        }
        info!("   🤖 LLM provider: {}", config.llm.provider);
        info!("   🔧 LLM model: {:?}", config.llm.model);
        info!(
            "   🧵 Concurrent analyses: {} (on file error: {})",
            config.pipeline.max_concurrent_analyses, config.pipeline.on_file_error
        );

        Ok(Self {
            config,
            config_path,
        })
    }

    /// Load .env file if it exists
    fn load_dotenv() {
        if Path::new(".env").exists() {
            if let Err(e) = dotenv::from_filename(".env") {
                warn!("Failed to load .env file: {}", e);
            } else {
                info!("📋 Loaded .env file from current directory");
            }
            return;
        }

        if let Some(home) = dirs::home_dir() {
            let home_env = home.join(".codescribe.env");
            if home_env.exists() {
                if let Err(e) = dotenv::from_path(&home_env) {
                    warn!("Failed to load .codescribe.env: {}", e);
                } else {
                    info!("📋 Loaded .codescribe.env from home directory");
                }
            }
        }
    }

    /// Find and load config file
    /// Search order:
    /// 1. ./.codescribe.toml (current directory)
    /// 2. ~/.codescribe/config.toml (user config)
    /// 3. Use defaults
    fn load_config_file() -> Result<(CodeScribeConfig, Option<PathBuf>), ConfigError> {
        let local_config = Path::new(".codescribe.toml");
        if local_config.exists() {
            let config = Self::read_toml_file(local_config)?;
            return Ok((config, Some(local_config.to_path_buf())));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".codescribe").join("config.toml");
            if user_config.exists() {
                let config = Self::read_toml_file(&user_config)?;
                return Ok((config, Some(user_config)));
            }
        }

        info!("📋 No config file found, using defaults");
        Ok((CodeScribeConfig::default(), None))
    }

    /// Read TOML config file
    pub fn read_toml_file(path: &Path) -> Result<CodeScribeConfig, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError(e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(mut config: CodeScribeConfig) -> CodeScribeConfig {
        // LLM configuration
        if let Ok(provider) =
            std::env::var("CODESCRIBE_LLM_PROVIDER").or_else(|_| std::env::var("LLM_PROVIDER"))
        {
            config.llm.provider = provider;
        }
        if let Ok(model) = std::env::var("CODESCRIBE_MODEL") {
            config.llm.model = Some(model);
        }
        if let Ok(url) = std::env::var("CODESCRIBE_BASE_URL") {
            config.llm.base_url = Some(url);
        }
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            config.llm.openai_api_key.get_or_insert(key);
        }
        if let Ok(key) = std::env::var("DASHSCOPE_API_KEY") {
            config.llm.dashscope_api_key.get_or_insert(key);
        }

        // Pipeline configuration
        if let Ok(concurrency) = std::env::var("CODESCRIBE_MAX_CONCURRENT") {
            if let Ok(n) = concurrency.parse() {
                config.pipeline.max_concurrent_analyses = n;
            }
        }
        if let Ok(policy) = std::env::var("CODESCRIBE_ON_FILE_ERROR") {
            config.pipeline.on_file_error = policy.to_lowercase();
        }
        if let Ok(path) = std::env::var("CODESCRIBE_TRACE_LOG") {
            config.pipeline.trace_log_path = Some(PathBuf::from(path));
        }

        // Logging
        if let Ok(level) = std::env::var("CODESCRIBE_LOG_LEVEL") {
            config.logging.level = level.to_lowercase();
        }

        config
    }

    /// Lowercase the enumerated string settings so TOML and env values match alike
    fn normalize(mut config: CodeScribeConfig) -> CodeScribeConfig {
        config.llm.provider = config.llm.provider.to_lowercase();
        config.pipeline.on_file_error = config.pipeline.on_file_error.to_lowercase();
        config.logging.level = config.logging.level.to_lowercase();
        config.logging.format = config.logging.format.to_lowercase();
        config
    }

    /// Validate configuration
    fn validate_config(config: &CodeScribeConfig) -> Result<(), ConfigError> {
        match config.llm.provider.to_lowercase().as_str() {
            "openai" | "qwen" | "dashscope" | "openai-compatible" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid LLM provider: {}. Must be one of: openai, qwen, dashscope, openai-compatible",
                    other
                )))
            }
        }

        if config.pipeline.max_concurrent_analyses == 0 {
            return Err(ConfigError::ValidationError(
                "max_concurrent_analyses must be at least 1".to_string(),
            ));
        }

        config
            .pipeline
            .on_file_error
            .parse::<FileFailurePolicy>()
            .map_err(ConfigError::ValidationError)?;

        match config.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                    other
                )))
            }
        }

        match config.logging.format.to_lowercase().as_str() {
            "pretty" | "compact" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log format: {}. Must be one of: pretty, compact",
                    other
                )))
            }
        }

        Ok(())
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &CodeScribeConfig {
        &self.config
    }

    /// Get the path to the config file that was loaded, if any
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Create a default config file
    pub fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        let config = CodeScribeConfig::default();
        let toml_str =
            toml::to_string_pretty(&config).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::ReadError(e.to_string()))?;
        }

        std::fs::write(path, toml_str).map_err(|e| ConfigError::ReadError(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CodeScribeConfig::default();
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.llm.temperature, 0.0);
        assert_eq!(config.llm.max_retries, 0);
        assert_eq!(config.pipeline.max_concurrent_analyses, 1);
        assert_eq!(config.pipeline.failure_policy(), FileFailurePolicy::Abort);
    }

    #[test]
    fn test_config_validation() {
        let config = CodeScribeConfig::default();
        assert!(ConfigManager::validate_config(&config).is_ok());

        let mut bad_provider = config.clone();
        bad_provider.llm.provider = "invalid".to_string();
        assert!(ConfigManager::validate_config(&bad_provider).is_err());

        let mut zero_concurrency = config.clone();
        zero_concurrency.pipeline.max_concurrent_analyses = 0;
        assert!(ConfigManager::validate_config(&zero_concurrency).is_err());

        let mut bad_policy = config.clone();
        bad_policy.pipeline.on_file_error = "retry".to_string();
        assert!(ConfigManager::validate_config(&bad_policy).is_err());

        let mut upper_level = config.clone();
        upper_level.logging.level = "INFO".to_string();
        assert!(ConfigManager::validate_config(&upper_level).is_ok());

        let mut bad_format = config;
        bad_format.logging.format = "json".to_string();
        assert!(ConfigManager::validate_config(&bad_format).is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: CodeScribeConfig = toml::from_str(
            r#"
[llm]
provider = "qwen"
model = "qwen-plus"

[pipeline]
on_file_error = "skip"
"#,
        )
        .unwrap();

        assert_eq!(config.llm.provider, "qwen");
        assert_eq!(config.llm.model.as_deref(), Some("qwen-plus"));
        assert_eq!(config.llm.timeout_secs, 120);
        assert_eq!(config.pipeline.failure_policy(), FileFailurePolicy::Skip);
        assert_eq!(config.logging.level, "info");
    }
}
