//! SHA-256 digest for codes at rest and subjects in keys

use sha2::{Digest, Sha256};

use super::traits::CodeDigest;

/// SHA-256 rendered as 64 lowercase hex characters
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Digest;

impl Sha256Digest {
    pub fn new() -> Self {
        Self
    }
}

impl CodeDigest for Sha256Digest {
    fn digest(&self, input: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(input.as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vector() {
        assert_eq!(
            Sha256Digest::new().digest("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_hash_code() {
        let digest = Sha256Digest::new();
        let hash1 = digest.digest("123456");
        let hash2 = digest.digest("654321");

        assert_eq!(hash1, digest.digest("123456"));
        assert_ne!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
        assert!(hash1.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}
