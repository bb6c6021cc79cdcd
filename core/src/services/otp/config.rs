//! Per-request options for issuing a code

use serde::{Deserialize, Serialize};

use otp_shared::config::{OtpConfig, MAX_CODE_LENGTH, MAX_TTL_MINUTES};

use crate::errors::{DomainError, DomainResult};

/// Optional overrides for a single `create` call
///
/// Any field left as `None` falls back to the configured default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct CreateOtpOptions {
    /// Minutes before the code expires
    #[serde(default)]
    pub ttl_minutes: Option<u64>,
    /// Number of digits in the code
    #[serde(default)]
    pub code_length: Option<u32>,
    /// Minimum seconds before another code can be issued for the same subject
    #[serde(default)]
    pub rate_limit_seconds: Option<u64>,
}

impl CreateOtpOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl_minutes(mut self, minutes: u64) -> Self {
        self.ttl_minutes = Some(minutes);
        self
    }

    pub fn with_code_length(mut self, length: u32) -> Self {
        self.code_length = Some(length);
        self
    }

    pub fn with_rate_limit_seconds(mut self, seconds: u64) -> Self {
        self.rate_limit_seconds = Some(seconds);
        self
    }

    /// Merge with configured defaults and check bounds
    pub(crate) fn resolve(&self, defaults: &OtpConfig) -> DomainResult<ResolvedOptions> {
        let resolved = ResolvedOptions {
            ttl_minutes: self.ttl_minutes.unwrap_or(defaults.default_ttl_minutes),
            code_length: self.code_length.unwrap_or(defaults.default_code_length),
            rate_limit_seconds: self
                .rate_limit_seconds
                .unwrap_or(defaults.min_rate_limit_seconds),
        };

        if resolved.ttl_minutes == 0 || resolved.ttl_minutes > MAX_TTL_MINUTES {
            return Err(DomainError::invalid_argument(
                "ttl_minutes",
                format!("must be between 1 and {}", MAX_TTL_MINUTES),
            ));
        }
        if resolved.code_length == 0 || resolved.code_length > MAX_CODE_LENGTH {
            return Err(DomainError::invalid_argument(
                "code_length",
                format!("must be between 1 and {}", MAX_CODE_LENGTH),
            ));
        }
        if resolved.rate_limit_seconds == 0 {
            return Err(DomainError::invalid_argument(
                "rate_limit_seconds",
                "must be positive",
            ));
        }

        Ok(resolved)
    }
}

/// Options after defaults are applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ResolvedOptions {
    pub ttl_minutes: u64,
    pub code_length: u32,
    pub rate_limit_seconds: u64,
}

impl ResolvedOptions {
    pub fn ttl_seconds(&self) -> u64 {
        self.ttl_minutes * 60
    }
}
