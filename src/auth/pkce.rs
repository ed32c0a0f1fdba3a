//! PKCE verifier and challenge generation

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

/// Challenge method sent with the authorization request
pub const CHALLENGE_METHOD: &str = "S256";

/// Number of random bytes in a verifier
const VERIFIER_BYTES: usize = 32;

/// Proof-of-possession secret for one authorization attempt
///
/// Lives only in memory. `Debug` does not print the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct CodeVerifier(String);

impl CodeVerifier {
    /// Generate a verifier from 32 bytes of OS randomness, URL-safe base64 without padding
    pub fn generate() -> Self {
        let mut bytes = [0u8; VERIFIER_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Wrap an existing verifier string
    pub fn from_string(verifier: impl Into<String>) -> Self {
        Self(verifier.into())
    }

    /// The verifier as sent to the token endpoint
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Derive the challenge: URL-safe base64 (unpadded) of SHA-256 over the verifier's ASCII bytes
    pub fn challenge(&self) -> String {
        URL_SAFE_NO_PAD.encode(Sha256::digest(self.0.as_bytes()))
    }
}

impl std::fmt::Debug for CodeVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CodeVerifier(..)")
    }
}
