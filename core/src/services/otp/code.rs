//! Plaintext code generation and constant-time comparison

use rand::{rngs::OsRng, CryptoRng, Rng, RngCore};
use std::fmt;

/// Plaintext one-time code
///
/// Handed to the caller once for out-of-band delivery. `Debug` and `Display`
/// are redacted so the value never reaches logs through formatting; use
/// `expose` to read the digits.
#[derive(Clone, PartialEq, Eq)]
pub struct OtpCode(String);

impl OtpCode {
    /// The digits to deliver to the user
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for OtpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OtpCode(<redacted>)")
    }
}

impl fmt::Display for OtpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

/// Generate a `length`-digit code from the OS CSPRNG
pub fn generate_code(length: u32) -> OtpCode {
    generate_code_with(&mut OsRng, length)
}

/// Generate a `length`-digit code from the given cryptographic RNG
///
/// Each digit is sampled uniformly from 0-9 and leading zeros are kept.
pub fn generate_code_with<R>(rng: &mut R, length: u32) -> OtpCode
where
    R: RngCore + CryptoRng,
{
    let digits = (0..length)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect();
    OtpCode(digits)
}

/// Compare two byte strings in time independent of where they first differ
///
/// Every byte pair is folded into one accumulator before the single final
/// check. Lengths are not secret here (digests are fixed width), so a length
/// mismatch returns early.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut diff: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }

    std::hint::black_box(diff) == 0
}
