use rand::RngCore;
use sha2::{Digest, Sha256};

/// Bearer credential handed to a guest in place of a session.
#[derive(Clone, PartialEq, Eq)]
pub struct GuestAccessToken(String);

impl GuestAccessToken {
    pub fn mint() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn digest(&self) -> String {
        digest_token(&self.0)
    }
}

impl std::fmt::Debug for GuestAccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("GuestAccessToken(..)")
    }
}

/// Only the digest is stored, so a leaked orders table does not leak tokens.
pub fn digest_token(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn minted_tokens_are_non_empty_and_distinct() {
        let mut seen = HashSet::new();
        for _ in 0..500 {
            let token = GuestAccessToken::mint();
            assert_eq!(token.as_str().len(), 64);
            assert!(seen.insert(token.as_str().to_string()));
        }
    }

    #[test]
    fn digest_matches_raw_value() {
        let token = GuestAccessToken::mint();
        assert_eq!(token.digest(), digest_token(token.as_str()));
        assert_ne!(token.digest(), token.as_str());
    }
}
