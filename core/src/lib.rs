//! # Campus OTP Core
//!
//! Domain layer of the one-time-password service. This crate owns the OTP
//! lifecycle (issue, hashed storage, rate-limited issuance, attempt-limited
//! verification, single-use consumption) and the seams it needs from its
//! environment: a key-value store with per-key expiry, a digest and a clock.
//! Concrete store adapters live in the infrastructure crate.

pub mod errors;
pub mod services;

// Re-export commonly used types for convenience
pub use errors::*;
pub use services::*;
