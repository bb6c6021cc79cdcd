//! Business services containing domain logic.

pub mod otp;

// Re-export commonly used types
pub use otp::{
    Clock, CodeDigest, CreateOtpOptions, IssuedOtp, KeyValueStore, OtpCode, OtpConfig, OtpKeys,
    OtpService, Sha256Digest, StoreError, StoreResult, SystemClock,
};
