use crate::config_manager::ConfigError;
use crate::types::PipelineStage;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failures talking to a model backend
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Authentication rejected: {0}")]
    Auth(String),

    #[error("Rate limited: {0}")]
    RateLimit(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
}

impl GatewayError {
    /// Map a non-success HTTP status and body to the matching variant
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 | 403 => GatewayError::Auth(message),
            429 => GatewayError::RateLimit(message),
            _ => GatewayError::Api { status, message },
        }
    }

    /// Whether another attempt could succeed without changing the request
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GatewayError::Transport(_) | GatewayError::RateLimit(_) | GatewayError::Timeout(_)
        )
    }
}

/// Sanitized model output did not decode into the expected structure
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Unexpected shape: {0}")]
    Shape(String),
}

#[derive(Error, Debug)]
pub enum CodeScribeError {
    #[error("Failed to read {}: {source}", path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Model gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{stage} stage failed: {source}")]
    Stage {
        stage: PipelineStage,
        #[source]
        source: Box<CodeScribeError>,
    },
}

impl CodeScribeError {
    /// Attribute this error to the pipeline stage that was running
    pub fn in_stage(self, stage: PipelineStage) -> Self {
        match self {
            already @ CodeScribeError::Stage { .. } => already,
            other => CodeScribeError::Stage {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// The stage this error was attributed to, if any
    pub fn stage(&self) -> Option<PipelineStage> {
        match self {
            CodeScribeError::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CodeScribeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_map_to_gateway_variants() {
        assert!(matches!(
            GatewayError::from_status(401, "bad key"),
            GatewayError::Auth(_)
        ));
        assert!(matches!(
            GatewayError::from_status(403, "forbidden"),
            GatewayError::Auth(_)
        ));
        assert!(matches!(
            GatewayError::from_status(429, "slow down"),
            GatewayError::RateLimit(_)
        ));
        assert!(matches!(
            GatewayError::from_status(500, "boom"),
            GatewayError::Api { status: 500, .. }
        ));
    }

    #[test]
    fn only_transient_failures_are_retryable() {
        assert!(GatewayError::Transport("reset".into()).is_retryable());
        assert!(GatewayError::RateLimit("429".into()).is_retryable());
        assert!(GatewayError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(!GatewayError::Auth("401".into()).is_retryable());
        assert!(!GatewayError::InvalidResponse("no choices".into()).is_retryable());
    }

    #[test]
    fn stage_attribution_is_not_nested() {
        let err = CodeScribeError::from(GatewayError::Transport("reset".into()))
            .in_stage(PipelineStage::Discovery)
            .in_stage(PipelineStage::Synthesis);

        assert_eq!(err.stage(), Some(PipelineStage::Discovery));
        assert!(err.to_string().starts_with("discovery stage failed"));
    }
}
