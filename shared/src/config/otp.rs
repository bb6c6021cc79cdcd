//! OTP lifecycle configuration module

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Longest code the service will issue
pub const MAX_CODE_LENGTH: u32 = 18;

/// Longest code lifetime in minutes (one week)
pub const MAX_TTL_MINUTES: u64 = 7 * 24 * 60;

/// Module-wide defaults for one-time-password issuance and verification
///
/// Every value can be overridden per `create` call except the attempt
/// ceiling and the attempts window, which are fixed for the service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct OtpConfig {
    /// Minutes before an issued code expires
    #[serde(default = "default_ttl_minutes")]
    pub default_ttl_minutes: u64,

    /// Number of decimal digits in an issued code
    #[serde(default = "default_code_length")]
    pub default_code_length: u32,

    /// Minimum seconds between two issuances for the same purpose and subject
    #[serde(default = "default_min_rate_limit_seconds")]
    pub min_rate_limit_seconds: u64,

    /// Verify calls allowed per attempts window; the call that reaches it is rejected
    #[serde(default = "default_max_verify_attempts")]
    pub max_verify_attempts: u32,

    /// Lifetime of the attempt counter, defaults to `default_ttl_minutes`
    #[serde(default)]
    pub attempts_ttl_minutes: Option<u64>,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            default_ttl_minutes: default_ttl_minutes(),
            default_code_length: default_code_length(),
            min_rate_limit_seconds: default_min_rate_limit_seconds(),
            max_verify_attempts: default_max_verify_attempts(),
            attempts_ttl_minutes: None,
        }
    }
}

impl OtpConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create from an arbitrary key lookup, unparsable values fall back to defaults
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let read = |key: &str| lookup(key).and_then(|value| value.trim().parse::<u64>().ok());

        Self {
            default_ttl_minutes: read("OTP_DEFAULT_TTL_MINUTES")
                .unwrap_or(defaults.default_ttl_minutes),
            default_code_length: read("OTP_DEFAULT_CODE_LENGTH")
                .and_then(|v| u32::try_from(v).ok())
                .unwrap_or(defaults.default_code_length),
            min_rate_limit_seconds: read("OTP_MIN_RATE_LIMIT_SECONDS")
                .unwrap_or(defaults.min_rate_limit_seconds),
            max_verify_attempts: read("OTP_MAX_VERIFY_ATTEMPTS")
                .and_then(|v| u32::try_from(v).ok())
                .unwrap_or(defaults.max_verify_attempts),
            attempts_ttl_minutes: read("OTP_ATTEMPTS_TTL_MINUTES"),
        }
    }

    /// Lifetime of the verify-attempt counter in seconds
    pub fn attempts_ttl_seconds(&self) -> u64 {
        self.attempts_ttl_minutes
            .unwrap_or(self.default_ttl_minutes)
            .saturating_mul(60)
    }

    /// Check that every value is a positive integer within bounds
    ///
    /// The attempt ceiling must be at least 2: the call that reaches it is
    /// rejected, so a ceiling of 1 would never evaluate a code.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_ttl_minutes == 0 || self.default_ttl_minutes > MAX_TTL_MINUTES {
            return Err(ConfigError::invalid(
                "default_ttl_minutes",
                format!("must be between 1 and {}", MAX_TTL_MINUTES),
            ));
        }
        if self.default_code_length == 0 || self.default_code_length > MAX_CODE_LENGTH {
            return Err(ConfigError::invalid(
                "default_code_length",
                format!("must be between 1 and {}", MAX_CODE_LENGTH),
            ));
        }
        if self.min_rate_limit_seconds == 0 {
            return Err(ConfigError::invalid("min_rate_limit_seconds", "must be positive"));
        }
        if self.max_verify_attempts < 2 {
            return Err(ConfigError::invalid("max_verify_attempts", "must be at least 2"));
        }
        if self.attempts_ttl_minutes == Some(0) {
            return Err(ConfigError::invalid("attempts_ttl_minutes", "must be positive"));
        }
        Ok(())
    }
}

fn default_ttl_minutes() -> u64 {
    5
}

fn default_code_length() -> u32 {
    6
}

fn default_min_rate_limit_seconds() -> u64 {
    60
}

fn default_max_verify_attempts() -> u32 {
    5
}
