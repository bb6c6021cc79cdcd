//! Main OTP service implementation

use chrono::Duration;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use otp_shared::config::OtpConfig;

use crate::errors::{DomainError, DomainResult};

use super::clock::SystemClock;
use super::code::{constant_time_eq, generate_code};
use super::config::CreateOtpOptions;
use super::digest::Sha256Digest;
use super::keys::OtpKeys;
use super::traits::{Clock, CodeDigest, KeyValueStore, StoreError};
use super::types::IssuedOtp;

/// Value stored at the rate-limit key; only its presence matters
const RATE_LIMIT_MARKER: &str = "1";

/// OTP lifecycle service
///
/// Stateless: every piece of state lives in the key-value store, so one
/// instance can be shared freely across tasks.
pub struct OtpService<S: KeyValueStore> {
    /// Key-value store holding markers, hashes and counters
    store: Arc<S>,
    /// Digest for codes at rest and subjects in keys
    digest: Arc<dyn CodeDigest>,
    /// Clock used to compute expiry instants
    clock: Arc<dyn Clock>,
    /// Resolved service defaults
    config: OtpConfig,
}

impl<S: KeyValueStore> OtpService<S> {
    /// Create a new OTP service with SHA-256 hashing and the system clock
    ///
    /// # Arguments
    ///
    /// * `store` - Key-value store implementation
    /// * `config` - Service defaults, validated here
    pub fn new(store: Arc<S>, config: OtpConfig) -> DomainResult<Self> {
        Self::with_components(
            store,
            Arc::new(Sha256Digest::new()),
            Arc::new(SystemClock),
            config,
        )
    }

    /// Create a new OTP service with explicit digest and clock
    pub fn with_components(
        store: Arc<S>,
        digest: Arc<dyn CodeDigest>,
        clock: Arc<dyn Clock>,
        config: OtpConfig,
    ) -> DomainResult<Self> {
        config.validate()?;

        Ok(Self {
            store,
            digest,
            clock,
            config,
        })
    }

    pub fn config(&self) -> &OtpConfig {
        &self.config
    }

    /// Derive the store keys for a purpose and subject
    pub fn keys_for(&self, purpose: &str, subject: &str) -> OtpKeys {
        OtpKeys::derive(purpose, subject, self.digest.as_ref())
    }

    /// Issue a new code for a purpose and subject
    ///
    /// This method:
    /// 1. Rejects blank purpose or subject
    /// 2. Resolves per-call options against the configured defaults
    /// 3. Claims the rate-limit marker atomically (set-if-absent)
    /// 4. Resets the verify-attempt counter
    /// 5. Generates a code and stores only its hash, replacing any previous one
    ///
    /// If step 4 or 5 fails the rate-limit marker is released and any
    /// previously issued code stays valid.
    ///
    /// # Arguments
    ///
    /// * `purpose` - Scenario tag, e.g. `password-change`
    /// * `subject` - Stable identifier of the principal
    /// * `options` - Optional overrides for TTL, code length and rate limit
    ///
    /// # Returns
    ///
    /// * `Ok(IssuedOtp)` - The plaintext code and its expiry instant
    /// * `Err(DomainError::InvalidArgument)` - Blank input or out-of-range option
    /// * `Err(DomainError::RateLimited)` - A code was issued too recently
    /// * `Err(DomainError::Unavailable)` - The store could not be used
    pub async fn create(
        &self,
        purpose: &str,
        subject: &str,
        options: &CreateOtpOptions,
    ) -> DomainResult<IssuedOtp> {
        ensure_not_blank("purpose", purpose)?;
        ensure_not_blank("subject", subject)?;
        let resolved = options.resolve(&self.config)?;
        let keys = self.keys_for(purpose, subject);

        let claimed = self
            .store
            .set_if_absent(&keys.rate, RATE_LIMIT_MARKER, resolved.rate_limit_seconds)
            .await
            .map_err(|e| self.store_failure("claim_rate_limit", purpose, &keys, e))?;

        if !claimed {
            warn!(
                purpose = purpose,
                subject = keys.subject_tag(),
                window_seconds = resolved.rate_limit_seconds,
                event = "otp_rate_limited",
                "OTP requested again inside the rate limit window"
            );
            return Err(DomainError::RateLimited {
                message: format!(
                    "A code was issued recently, please wait up to {} seconds before requesting a new one",
                    resolved.rate_limit_seconds
                ),
                retry_after_seconds: Some(resolved.rate_limit_seconds),
            });
        }

        let expires_at = Duration::try_minutes(resolved.ttl_minutes as i64)
            .and_then(|ttl| self.clock.now().checked_add_signed(ttl))
            .ok_or_else(|| DomainError::invalid_argument("ttl_minutes", "out of range"))?;

        let code = generate_code(resolved.code_length);
        let code_hash = self.digest.digest(code.expose());

        // Counter first: a failure here must leave the previous code usable
        if let Err(e) = self.store.delete(&keys.attempts).await {
            self.release_rate_limit(&keys).await;
            return Err(self.store_failure("reset_attempts", purpose, &keys, e));
        }

        if let Err(e) = self
            .store
            .set_with_expiry(&keys.data, &code_hash, resolved.ttl_seconds())
            .await
        {
            self.release_rate_limit(&keys).await;
            return Err(self.store_failure("store_code", purpose, &keys, e));
        }

        info!(
            purpose = purpose,
            subject = keys.subject_tag(),
            code_length = resolved.code_length,
            expires_at = %expires_at,
            event = "otp_created",
            "Issued new one-time code"
        );

        Ok(IssuedOtp { code, expires_at })
    }

    /// Verify a code and consume it on success
    ///
    /// This method:
    /// 1. Returns `false` for a missing or empty code without charging an attempt
    /// 2. Rejects the call once the attempt ceiling is reached
    /// 3. Charges one attempt atomically, whatever the outcome
    /// 4. Compares hashes in constant time
    /// 5. Deletes the record and clears the counter on a match
    ///
    /// # Arguments
    ///
    /// * `purpose` - Scenario tag the code was issued for
    /// * `subject` - Principal the code was issued for
    /// * `code` - Code supplied by the user
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - The code matched and has been consumed
    /// * `Ok(false)` - Wrong, expired, consumed or never issued
    /// * `Err(DomainError::RateLimited)` - Attempt ceiling reached
    /// * `Err(DomainError::Unavailable)` - The store could not be used
    pub async fn verify_and_consume(
        &self,
        purpose: &str,
        subject: &str,
        code: Option<&str>,
    ) -> DomainResult<bool> {
        let code = match code {
            Some(code) if !code.is_empty() => code,
            _ => {
                debug!(purpose = purpose, "Empty verification code, nothing to check");
                return Ok(false);
            }
        };
        ensure_not_blank("purpose", purpose)?;
        ensure_not_blank("subject", subject)?;

        let keys = self.keys_for(purpose, subject);
        let max_attempts = i64::from(self.config.max_verify_attempts);

        let current = self.read_attempts(purpose, &keys).await?;
        if current >= max_attempts {
            return Err(self.attempts_exhausted(purpose, &keys, current));
        }

        let attempts = self
            .store
            .increment(&keys.attempts, self.config.attempts_ttl_seconds())
            .await
            .map_err(|e| self.store_failure("charge_attempt", purpose, &keys, e))?;

        if attempts >= max_attempts {
            return Err(self.attempts_exhausted(purpose, &keys, attempts));
        }

        let stored_hash = match self
            .store
            .get(&keys.data)
            .await
            .map_err(|e| self.store_failure("load_code", purpose, &keys, e))?
        {
            Some(hash) => hash,
            None => {
                debug!(
                    purpose = purpose,
                    subject = keys.subject_tag(),
                    attempt = attempts,
                    "No live code (never issued, expired or consumed)"
                );
                return Ok(false);
            }
        };

        let provided_hash = self.digest.digest(code);
        if !constant_time_eq(stored_hash.as_bytes(), provided_hash.as_bytes()) {
            warn!(
                purpose = purpose,
                subject = keys.subject_tag(),
                attempt = attempts,
                max_attempts = max_attempts,
                event = "otp_verify_failed",
                "Verification code mismatch"
            );
            return Ok(false);
        }

        self.store
            .delete(&keys.data)
            .await
            .map_err(|e| self.store_failure("consume_code", purpose, &keys, e))?;

        if let Err(e) = self.store.delete(&keys.attempts).await {
            // The counter still expires on its own
            warn!(
                purpose = purpose,
                subject = keys.subject_tag(),
                error = %e,
                "Failed to clear attempt counter after successful verification"
            );
        }

        info!(
            purpose = purpose,
            subject = keys.subject_tag(),
            attempt = attempts,
            event = "otp_verified",
            "Verification code consumed"
        );

        Ok(true)
    }

    /// Verify calls that will still be evaluated before lockout
    pub async fn remaining_attempts(&self, purpose: &str, subject: &str) -> DomainResult<u32> {
        ensure_not_blank("purpose", purpose)?;
        ensure_not_blank("subject", subject)?;

        let keys = self.keys_for(purpose, subject);
        let current = self.read_attempts(purpose, &keys).await?;
        let usable = i64::from(self.config.max_verify_attempts) - 1;

        Ok(u32::try_from((usable - current).max(0)).unwrap_or(0))
    }

    /// Check whether the store answers a round trip
    ///
    /// Never fails: an unreachable store is reported as `false`.
    pub async fn is_operational(&self) -> bool {
        match self.store.ping().await {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    error = %e,
                    event = "otp_store_unavailable",
                    "OTP store health check failed"
                );
                false
            }
        }
    }

    /// Read the attempt counter, absent counts as zero
    async fn read_attempts(&self, purpose: &str, keys: &OtpKeys) -> DomainResult<i64> {
        let raw = self
            .store
            .get(&keys.attempts)
            .await
            .map_err(|e| self.store_failure("read_attempts", purpose, keys, e))?;

        match raw {
            None => Ok(0),
            Some(value) => match value.parse::<i64>() {
                Ok(count) => Ok(count),
                Err(_) => {
                    // Unreadable counter locks rather than resets
                    warn!(
                        purpose = purpose,
                        subject = keys.subject_tag(),
                        "Attempt counter holds a non-numeric value"
                    );
                    Ok(i64::from(self.config.max_verify_attempts))
                }
            },
        }
    }

    /// Best-effort removal of the rate-limit marker after a failed issue
    async fn release_rate_limit(&self, keys: &OtpKeys) {
        if let Err(e) = self.store.delete(&keys.rate).await {
            warn!(
                subject = keys.subject_tag(),
                error = %e,
                "Failed to release rate limit marker"
            );
        }
    }

    fn attempts_exhausted(&self, purpose: &str, keys: &OtpKeys, attempts: i64) -> DomainError {
        warn!(
            purpose = purpose,
            subject = keys.subject_tag(),
            attempts = attempts,
            max_attempts = self.config.max_verify_attempts,
            event = "otp_attempts_exhausted",
            "Maximum verification attempts reached"
        );

        DomainError::RateLimited {
            message: "Too many verification attempts, request a new code later".to_string(),
            retry_after_seconds: None,
        }
    }

    fn store_failure(
        &self,
        operation: &str,
        purpose: &str,
        keys: &OtpKeys,
        error: StoreError,
    ) -> DomainError {
        error!(
            operation = operation,
            purpose = purpose,
            subject = keys.subject_tag(),
            error = %error,
            event = "otp_store_unavailable",
            "OTP store operation failed"
        );
        DomainError::from(error)
    }
}

fn ensure_not_blank(field: &str, value: &str) -> DomainResult<()> {
    if value.trim().is_empty() {
        return Err(DomainError::invalid_argument(field, "must not be blank"));
    }
    Ok(())
}
