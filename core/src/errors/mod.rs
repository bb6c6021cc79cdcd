//! Domain-specific error types and error handling.

use otp_shared::config::ConfigError;
use thiserror::Error;

use crate::services::otp::StoreError;

/// Core domain errors raised by the OTP service
///
/// A wrong, expired or already consumed code is not an error: verification
/// returns `Ok(false)` for all of those so callers cannot tell them apart.
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Invalid argument {field}: {message}")]
    InvalidArgument { field: String, message: String },

    #[error("Rate limit exceeded: {message}")]
    RateLimited {
        message: String,
        retry_after_seconds: Option<u64>,
    },

    #[error("Service unavailable: {message}")]
    Unavailable { message: String },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),
}

impl DomainError {
    pub fn invalid_argument(field: &str, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// HTTP status a consuming API layer is expected to answer with
    pub fn status_code(&self) -> u16 {
        match self {
            DomainError::InvalidArgument { .. } => 400,
            DomainError::RateLimited { .. } => 429,
            DomainError::Unavailable { .. } => 503,
            DomainError::Configuration(_) => 500,
        }
    }

    /// Whether the same call may succeed later without any change by the caller
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DomainError::RateLimited { .. } | DomainError::Unavailable { .. }
        )
    }
}

impl From<StoreError> for DomainError {
    fn from(error: StoreError) -> Self {
        DomainError::Unavailable {
            message: error.to_string(),
        }
    }
}

pub type DomainResult<T> = Result<T, DomainError>;
