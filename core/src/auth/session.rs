//! Session Management
//!
//! Issues opaque bearer tokens after successful authentication and resolves
//! them on later requests. Tokens are 32 random bytes, base64url-encoded;
//! the store only ever sees the SHA-256 digest of a token, so a leaked
//! session table cannot be replayed.

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};
use tracing::debug;
use uuid::Uuid;

use super::error::AuthResult;
use crate::store::{SessionRecord, SessionStore};

/// Hash a session token for storage or lookup. Deterministic SHA-256, hex.
#[must_use]
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Session handed to a caller after successful authentication.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    /// Opaque bearer token. This is the only copy; the store keeps a digest.
    pub token: String,
    /// Account the session authenticates.
    pub account_id: Uuid,
    /// Absolute expiry.
    pub expires_at: DateTime<Utc>,
}

/// Issues, validates, and revokes sessions.
///
/// Expiry is a fixed absolute lifetime from issuance. Expired records stop
/// validating immediately; [`SessionManager::purge_expired`] reclaims them
/// from a background sweep.
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    ttl: Duration,
}

impl SessionManager {
    /// `ttl_seconds` is the absolute session lifetime.
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>, ttl_seconds: i64) -> Self {
        Self {
            store,
            ttl: Duration::seconds(ttl_seconds),
        }
    }

    /// Mint a session for an account.
    pub async fn issue(&self, account_id: Uuid) -> AuthResult<IssuedSession> {
        let mut token_bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut token_bytes);
        let token = URL_SAFE_NO_PAD.encode(token_bytes);

        let now = Utc::now();
        let expires_at = now + self.ttl;
        self.store
            .insert(SessionRecord {
                id: Uuid::now_v7(),
                account_id,
                token_hash: hash_token(&token),
                created_at: now,
                expires_at,
            })
            .await?;

        debug!(account_id = %account_id, "Session issued");
        Ok(IssuedSession {
            token,
            account_id,
            expires_at,
        })
    }

    /// Resolve a token to its account id.
    ///
    /// Unknown, malformed, or expired tokens are `Ok(None)` - the normal
    /// unauthenticated state, not a fault.
    pub async fn validate(&self, token: &str) -> AuthResult<Option<Uuid>> {
        let record = self.store.find_valid(&hash_token(token), Utc::now()).await?;
        Ok(record.map(|r| r.account_id))
    }

    /// Revoke a token. Idempotent: revoking an unknown or already-revoked
    /// token is a no-op.
    pub async fn revoke(&self, token: &str) -> AuthResult<()> {
        self.store.delete(&hash_token(token)).await?;
        Ok(())
    }

    /// Revoke every session of an account ("log out everywhere").
    pub async fn revoke_all_for_account(&self, account_id: Uuid) -> AuthResult<u64> {
        Ok(self.store.delete_all_for_account(account_id).await?)
    }

    /// Physically remove expired records, returning the count removed.
    pub async fn purge_expired(&self) -> AuthResult<u64> {
        Ok(self.store.purge_expired(Utc::now()).await?)
    }
}
