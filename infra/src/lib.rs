//! # Infrastructure Layer
//!
//! Concrete implementations behind the OTP service seams:
//! - **Cache**: Redis client and the Redis/in-memory `KeyValueStore` adapters
//! - **Config**: layered configuration loading (`.env`, TOML file, environment)
//! - **Telemetry**: `tracing` subscriber setup
//!
//! The `otp-health` binary wires these together to check the store.

use std::sync::Arc;

use otp_core::services::OtpService;
use otp_shared::config::AppConfig;

/// Cache module - Redis client and store adapters
pub mod cache;

/// Configuration loading
pub mod config;

/// Tracing subscriber setup
pub mod telemetry;

pub use cache::{MemoryOtpStore, RedisClient, RedisOtpStore};
pub use config::load_config;
pub use telemetry::init_tracing;

/// Build an OTP service over a lazily connecting Redis store
///
/// No connection is opened here; the first store operation connects, so an
/// unreachable Redis surfaces through `is_operational` or as `Unavailable`.
pub fn initialize(config: &AppConfig) -> Result<OtpService<RedisOtpStore>, InfrastructureError> {
    tracing::info!(environment = %config.environment, "Initializing OTP service");

    let client = RedisClient::lazy(config.cache.clone())?;
    let store = Arc::new(RedisOtpStore::new(client));

    OtpService::new(store, config.otp.clone())
        .map_err(|e| InfrastructureError::Config(e.to_string()))
}

/// Infrastructure-specific error types
#[derive(Debug, thiserror::Error)]
pub enum InfrastructureError {
    /// Redis cache error
    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
