//! Types for OTP service results

use chrono::{DateTime, Utc};

use super::code::OtpCode;

/// Result of issuing a code
#[derive(Debug, Clone)]
pub struct IssuedOtp {
    /// The plaintext code, returned exactly once for out-of-band delivery
    pub code: OtpCode,
    /// When the stored record expires
    pub expires_at: DateTime<Utc>,
}
