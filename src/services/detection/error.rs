// Detection Errors
// Caller-facing failure kinds; every one aborts the whole detection

use thiserror::Error;

use crate::services::providers::ProviderError;

#[derive(Error, Debug)]
pub enum DetectionError {
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("Video processing timed out after {attempts} status checks. Try a shorter clip or retry later.")]
    Timeout { attempts: u32 },
    #[error("Detection cancelled")]
    Cancelled,
    #[error("{0}")]
    UnsupportedOperation(String),
    #[error("Unknown content type: {0}")]
    UnknownContentType(String),
    #[error("Content type {content_type} cannot analyze a {payload} payload")]
    InvalidPayload {
        content_type: &'static str,
        payload: &'static str,
    },
}

impl DetectionError {
    pub fn missing_credentials(provider: &str, env_hint: &str) -> Self {
        Self::Configuration(format!(
            "{} credentials not configured. Set {} or store them with `aiscope config set-key`",
            provider, env_hint
        ))
    }
}
