//! One-time-password service module
//!
//! This module provides the complete OTP lifecycle:
//! - Code generation from the OS CSPRNG
//! - Hash-at-rest storage with expiry
//! - Rate-limited issuance per purpose and subject
//! - Attempt-limited, constant-time verification
//! - Single-use consumption
//!
//! All state lives in an external key-value store under three keys per
//! `(purpose, subject)`:
//! - `otp:rate:{purpose}:{hash(subject)}` - Issuance rate-limit marker
//! - `otp:data:{purpose}:{hash(subject)}` - Hash of the live code
//! - `otp:attempts:{purpose}:{hash(subject)}` - Verify-attempt counter

mod clock;
mod code;
mod config;
mod digest;
mod keys;
mod service;
mod traits;
mod types;

#[cfg(test)]
mod tests;

pub use clock::SystemClock;
pub use code::{constant_time_eq, generate_code, generate_code_with, OtpCode};
pub use config::CreateOtpOptions;
pub use digest::Sha256Digest;
pub use keys::OtpKeys;
pub use otp_shared::config::OtpConfig;
pub use service::OtpService;
pub use traits::{Clock, CodeDigest, KeyValueStore, StoreError, StoreResult};
pub use types::IssuedOtp;
