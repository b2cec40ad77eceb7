//! PKCE (Proof Key for Code Exchange) implementation per RFC 7636
//!
//! Generates the code verifier and S256 challenge used during the OAuth
//! authorization flow. The verifier stays on the device and is sent during
//! token exchange; the challenge travels with the authorization request so
//! the server can verify the exchange request came from the same party
//! that initiated the flow.

use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::distr::{Alphanumeric, SampleString};
use sha2::{Digest, Sha256};

const VERIFIER_LENGTH: usize = 64;

/// Challenge derivation methods defined by RFC 7636.
///
/// Only `S256` is ever produced; `Plain` is recognized so callers can name
/// it, and intentionally unsupported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeChallengeMethod {
    Plain,
    S256,
}

impl CodeChallengeMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            CodeChallengeMethod::Plain => "plain",
            CodeChallengeMethod::S256 => "S256",
        }
    }
}

/// A verifier/challenge pair binding an authorization code to this client.
///
/// The challenge is a pure function of the verifier and is recomputed at
/// construction, never stored independently. Two codes are equal exactly
/// when their verifiers are equal.
#[derive(Clone, PartialEq, Eq)]
pub struct PkceCode {
    verifier: String,
    challenge: String,
}

impl PkceCode {
    /// Generate a fresh code: 64 random alphanumeric characters from the
    /// thread's cryptographically secure RNG.
    ///
    /// Always succeeds; the platform guarantees both the RNG and SHA-256.
    pub fn new_code() -> Self {
        let verifier = Alphanumeric.sample_string(&mut rand::rng(), VERIFIER_LENGTH);
        let challenge = compute_challenge(&verifier);
        Self {
            verifier,
            challenge,
        }
    }

    pub fn verifier(&self) -> &str {
        &self.verifier
    }

    pub fn challenge(&self) -> &str {
        &self.challenge
    }

    /// The method the challenge was derived with. Always S256.
    pub fn challenge_method(&self) -> CodeChallengeMethod {
        CodeChallengeMethod::S256
    }
}

// The verifier is a secret until the exchange completes; keep it out of logs.
impl fmt::Debug for PkceCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PkceCode")
            .field("verifier", &"[REDACTED]")
            .field("challenge", &self.challenge)
            .finish()
    }
}

/// Compute the S256 code challenge from a verifier.
///
/// `challenge = BASE64URL(SHA256(verifier))`, no padding.
pub fn compute_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}
