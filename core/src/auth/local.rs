//! Local Credential Strategy
//!
//! Registration and login with an identifier + secret. Stateless across
//! attempts. The hasher runs on the blocking pool so one slow Argon2 call
//! never stalls the async dispatch path.

use std::sync::Arc;

use tracing::info;

use super::error::{AuthError, AuthResult};
use super::password::{CredentialHasher, HashError};
use crate::store::{Account, AccountStore, StoreError};

pub struct LocalStrategy {
    hasher: Arc<dyn CredentialHasher>,
    accounts: Arc<dyn AccountStore>,
}

impl LocalStrategy {
    #[must_use]
    pub fn new(hasher: Arc<dyn CredentialHasher>, accounts: Arc<dyn AccountStore>) -> Self {
        Self { hasher, accounts }
    }

    /// Register a new local account.
    ///
    /// Establishes credentials only; the caller performs an explicit
    /// [`login`](Self::login) afterwards to obtain a session.
    pub async fn register(&self, identifier: &str, secret: &str) -> AuthResult<Account> {
        if identifier.is_empty() {
            return Err(AuthError::Validation("identifier must not be empty".into()));
        }
        if secret.is_empty() {
            return Err(AuthError::Validation("secret must not be empty".into()));
        }

        let verifier = self.hash_blocking(secret).await?;

        let account = match self.accounts.create_local(identifier, &verifier).await {
            Ok(account) => account,
            Err(StoreError::DuplicateIdentifier) => return Err(AuthError::DuplicateIdentifier),
            Err(e) => return Err(e.into()),
        };

        info!(account_id = %account.id, "Account registered");
        Ok(account)
    }

    /// Authenticate an identifier + secret, returning the matching account.
    ///
    /// The distinct failure variants (`AccountNotFound`, `NoLocalCredential`,
    /// `InvalidCredential`) are for internal consumption; the gateway
    /// collapses them before they reach a caller.
    pub async fn login(&self, identifier: &str, secret: &str) -> AuthResult<Account> {
        let account = self
            .accounts
            .find_by_identifier(identifier)
            .await?
            .ok_or(AuthError::AccountNotFound)?;

        let Some(verifier) = account.credential_verifier.clone() else {
            return Err(AuthError::NoLocalCredential);
        };

        if !self.verify_blocking(secret, verifier).await? {
            return Err(AuthError::InvalidCredential);
        }

        Ok(account)
    }

    async fn hash_blocking(&self, secret: &str) -> AuthResult<String> {
        let hasher = Arc::clone(&self.hasher);
        let secret = secret.to_owned();
        let verifier = tokio::task::spawn_blocking(move || hasher.hash(&secret))
            .await
            .map_err(|e| HashError::Hashing(format!("hashing task failed: {e}")))??;
        Ok(verifier)
    }

    async fn verify_blocking(&self, secret: &str, verifier: String) -> AuthResult<bool> {
        let hasher = Arc::clone(&self.hasher);
        let secret = secret.to_owned();
        let matches = tokio::task::spawn_blocking(move || hasher.verify(&secret, &verifier))
            .await
            .map_err(|e| HashError::Hashing(format!("verification task failed: {e}")))??;
        Ok(matches)
    }
}
