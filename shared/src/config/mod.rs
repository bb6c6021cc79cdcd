//! Configuration module with service-specific sub-modules
//!
//! This module organizes configuration into logical areas:
//! - `otp` - One-time-password lifecycle defaults
//! - `cache` - Redis connection configuration
//! - `environment` - Environment detection and logging configuration

pub mod cache;
pub mod environment;
pub mod otp;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// Re-export commonly used types
pub use cache::CacheConfig;
pub use environment::{Environment, LogFormat, LoggingConfig};
pub use otp::{OtpConfig, MAX_CODE_LENGTH, MAX_TTL_MINUTES};

/// Configuration validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Complete service configuration combining all sub-configurations
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Environment configuration
    #[serde(default)]
    pub environment: Environment,

    /// Redis cache configuration
    #[serde(default)]
    pub cache: CacheConfig,

    /// OTP lifecycle defaults
    #[serde(default)]
    pub otp: OtpConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        let env = Environment::default();
        Self {
            environment: env,
            cache: CacheConfig::default(),
            otp: OtpConfig::default(),
            logging: LoggingConfig::for_environment(env),
        }
    }
}

impl AppConfig {
    /// Create configuration for the given environment with built-in defaults
    pub fn for_environment(env: Environment) -> Self {
        Self {
            environment: env,
            logging: LoggingConfig::for_environment(env),
            ..Default::default()
        }
    }

    /// Validate every sub-configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.otp.validate()?;
        self.cache.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_app_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_for_environment_uses_matching_logging() {
        let config = AppConfig::for_environment(Environment::Production);
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_partial_deserialization_falls_back_to_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"otp": {"max_verify_attempts": 3}}"#).unwrap();
        assert_eq!(config.otp.max_verify_attempts, 3);
        assert_eq!(config.otp.default_code_length, 6);
        assert_eq!(config.cache.url, "redis://localhost:6379");
    }

    #[test]
    fn test_validate_surfaces_otp_errors() {
        let mut config = AppConfig::default();
        config.otp.default_ttl_minutes = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("default_ttl_minutes"));
    }
}
