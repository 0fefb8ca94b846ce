//! Error types for the provider layer

use crate::api::ApiError;

/// Error type for provider operations
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Resource type not found: {0}")]
    ResourceNotFound(String),

    #[error("Data source type not found: {0}")]
    DataSourceNotFound(String),

    #[error("Provider not configured")]
    NotConfigured,

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("{0}")]
    Custom(String),
}

/// Result type alias for provider operations
pub type Result<T> = std::result::Result<T, ProviderError>;

impl From<String> for ProviderError {
    fn from(s: String) -> Self {
        ProviderError::Custom(s)
    }
}

impl From<&str> for ProviderError {
    fn from(s: &str) -> Self {
        ProviderError::Custom(s.to_string())
    }
}
