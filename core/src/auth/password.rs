//! Credential Hashing
//!
//! Two policies behind one trait:
//!
//! - [`AdaptiveHasher`] - Argon2id with a fresh random salt per call,
//!   emitting PHC-format verifiers (e.g. `$argon2id$v=19$m=19456,t=2,p=1$...`).
//!   Each call is a deliberate tens-of-milliseconds CPU burn, so callers in
//!   this crate dispatch it through `tokio::task::spawn_blocking`.
//! - [`LegacyDigestHasher`] - a single unsalted SHA-256 pass. It offers no
//!   protection against precomputed tables or offline brute force and exists
//!   only for compatibility with verifier stores written before salted
//!   hashing was adopted. Not for production use.
//!
//! Which policy is active is a startup decision ([`HasherPolicy`]); call
//! sites only ever see `dyn CredentialHasher`.

use std::sync::Arc;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{
    self, PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString,
};
use argon2::Argon2;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Credential hashing failure.
#[derive(Debug, Error)]
pub enum HashError {
    /// Hashing could not complete. Resource exhaustion, never input shape.
    #[error("hashing failed: {0}")]
    Hashing(String),

    /// The stored verifier was not produced by this hasher.
    #[error("malformed verifier")]
    MalformedVerifier,
}

/// Turns a plaintext secret into a storable verifier and checks candidate
/// secrets against it.
///
/// Both operations are blocking and CPU-bound; run them on a worker thread,
/// never on an async dispatch path.
pub trait CredentialHasher: Send + Sync {
    /// Hash a plaintext secret into a verifier. Any non-empty input is
    /// valid; failure means resource exhaustion, not input shape.
    fn hash(&self, plaintext: &str) -> Result<String, HashError>;

    /// Verify a candidate secret against a stored verifier.
    ///
    /// A wrong secret is `Ok(false)`. `Err` is reserved for verifiers this
    /// hasher did not produce.
    fn verify(&self, plaintext: &str, verifier: &str) -> Result<bool, HashError>;
}

/// Argon2id hasher. Salted, adaptive-cost; the default policy.
pub struct AdaptiveHasher;

impl AdaptiveHasher {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Default for AdaptiveHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialHasher for AdaptiveHasher {
    fn hash(&self, plaintext: &str) -> Result<String, HashError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| HashError::Hashing(e.to_string()))?;
        Ok(hash.to_string())
    }

    fn verify(&self, plaintext: &str, verifier: &str) -> Result<bool, HashError> {
        let parsed = PasswordHash::new(verifier).map_err(|_| HashError::MalformedVerifier)?;
        match Argon2::default().verify_password(plaintext.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            // A mismatch is a normal outcome, not a fault.
            Err(password_hash::Error::Password) => Ok(false),
            Err(_) => Err(HashError::MalformedVerifier),
        }
    }
}

/// Unsalted SHA-256 hasher.
///
/// INSECURE: deterministic and fast, so identical secrets share a verifier
/// and rainbow tables / offline brute force apply at full speed. Kept only
/// for stores written before salted hashing was adopted; never select it for
/// new deployments.
pub struct LegacyDigestHasher;

impl CredentialHasher for LegacyDigestHasher {
    fn hash(&self, plaintext: &str) -> Result<String, HashError> {
        Ok(hex::encode(Sha256::digest(plaintext.as_bytes())))
    }

    fn verify(&self, plaintext: &str, verifier: &str) -> Result<bool, HashError> {
        let stored = hex::decode(verifier).map_err(|_| HashError::MalformedVerifier)?;
        if stored.len() != 32 {
            return Err(HashError::MalformedVerifier);
        }
        let candidate = Sha256::digest(plaintext.as_bytes());
        // Fold over the full digests rather than bailing at the first
        // mismatched byte.
        let mut diff = 0u8;
        for (a, b) in stored.iter().zip(candidate.iter()) {
            diff |= a ^ b;
        }
        Ok(diff == 0)
    }
}

/// Hasher policy, selected by configuration at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HasherPolicy {
    /// Salted Argon2id (default).
    Adaptive,
    /// Unsalted SHA-256 digest. Non-production.
    LegacyDigest,
}

impl HasherPolicy {
    /// Build the hasher for this policy.
    #[must_use]
    pub fn build(self) -> Arc<dyn CredentialHasher> {
        match self {
            Self::Adaptive => Arc::new(AdaptiveHasher::new()),
            Self::LegacyDigest => Arc::new(LegacyDigestHasher),
        }
    }
}
