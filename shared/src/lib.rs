//! Shared configuration types for the campus OTP service
//!
//! This crate provides the plain configuration structures used across the
//! workspace:
//! - OTP lifecycle defaults (TTL, code length, rate limit window, attempt ceiling)
//! - Redis cache connection settings
//! - Environment detection and logging configuration
//!
//! It performs no I/O beyond environment variable lookups; file and layered
//! loading lives in the infrastructure crate.

pub mod config;

// Re-export commonly used items at crate root
pub use config::{
    AppConfig, CacheConfig, ConfigError, Environment, LogFormat, LoggingConfig, OtpConfig,
};
