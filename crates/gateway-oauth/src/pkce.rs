//! PKCE (RFC 7636) verification and opaque-token generation.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Generate a cryptographically random, URL-safe opaque token (code,
/// access token, or refresh token) of `bytes` bytes of entropy.
#[must_use]
pub fn random_token(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    rand::rng().fill_bytes(&mut buf);
    URL_SAFE_NO_PAD.encode(buf)
}

/// `BASE64URL(SHA-256(verifier)) == challenge`, the PKCE `S256` check.
#[must_use]
pub fn verify_s256(verifier: &str, challenge: &str) -> bool {
    let digest = Sha256::digest(verifier.as_bytes());
    let computed = URL_SAFE_NO_PAD.encode(digest);
    // Challenges are not secret once issued (they travel in the
    // authorization redirect), so a plain equality check is fine here;
    // only client-secret comparisons need to be constant-time.
    computed == challenge
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifier_matching_challenge_succeeds() {
        // BASE64URL(SHA256("verifier123"))
        let verifier = "verifier123";
        let digest = Sha256::digest(verifier.as_bytes());
        let challenge = URL_SAFE_NO_PAD.encode(digest);
        assert!(verify_s256(verifier, &challenge));
    }

    #[test]
    fn wrong_verifier_fails() {
        let challenge = {
            let digest = Sha256::digest(b"verifier123");
            URL_SAFE_NO_PAD.encode(digest)
        };
        assert!(!verify_s256("wrong", &challenge));
    }

    #[test]
    fn random_token_has_requested_entropy_and_is_url_safe() {
        let token = random_token(32);
        assert!(!token.contains('+'));
        assert!(!token.contains('/'));
        assert!(!token.contains('='));
        assert!(token.len() >= 32);
    }
}
