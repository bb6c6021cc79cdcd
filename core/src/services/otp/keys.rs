//! Store key layout for one `(purpose, subject)` lifecycle

use super::traits::CodeDigest;

const KEY_NAMESPACE: &str = "otp";

/// The three store keys backing one OTP lifecycle
///
/// The subject only ever appears hashed, so listing keys reveals no identities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpKeys {
    /// Issuance rate-limit marker
    pub rate: String,
    /// Hash of the live code
    pub data: String,
    /// Verify-attempt counter
    pub attempts: String,
    subject_hash: String,
}

impl OtpKeys {
    pub fn derive(purpose: &str, subject: &str, digest: &dyn CodeDigest) -> Self {
        let subject_hash = digest.digest(subject);
        Self {
            rate: format_key("rate", purpose, &subject_hash),
            data: format_key("data", purpose, &subject_hash),
            attempts: format_key("attempts", purpose, &subject_hash),
            subject_hash,
        }
    }

    /// Short, non-reversible subject tag safe for logs
    pub fn subject_tag(&self) -> &str {
        let end = self.subject_hash.len().min(12);
        &self.subject_hash[..end]
    }
}

fn format_key(kind: &str, purpose: &str, subject_hash: &str) -> String {
    format!("{}:{}:{}:{}", KEY_NAMESPACE, kind, purpose, subject_hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::otp::Sha256Digest;

    struct EchoDigest;

    impl CodeDigest for EchoDigest {
        fn digest(&self, input: &str) -> String {
            format!("h({})", input)
        }
    }

    #[test]
    fn test_format_keys() {
        let keys = OtpKeys::derive("email-verify", "user-42", &EchoDigest);

        assert_eq!(keys.rate, "otp:rate:email-verify:h(user-42)");
        assert_eq!(keys.data, "otp:data:email-verify:h(user-42)");
        assert_eq!(keys.attempts, "otp:attempts:email-verify:h(user-42)");
    }

    #[test]
    fn test_subject_never_in_clear() {
        let subject = "alice@campus.edu";
        let keys = OtpKeys::derive("password-change", subject, &Sha256Digest::new());

        for key in [&keys.rate, &keys.data, &keys.attempts] {
            assert!(!key.contains(subject));
            assert!(key.starts_with("otp:"));
        }
        assert!(!keys.subject_tag().contains("alice"));
        assert_eq!(keys.subject_tag().len(), 12);
    }

    #[test]
    fn test_purposes_are_isolated() {
        let digest = Sha256Digest::new();
        let reset = OtpKeys::derive("password-change", "user-1", &digest);
        let verify = OtpKeys::derive("email-verify", "user-1", &digest);
        assert_ne!(reset.data, verify.data);
        assert_eq!(reset.subject_tag(), verify.subject_tag());
    }
}
