//! Auth Gateway
//!
//! The façade an external web layer calls. Dispatches to the local or
//! federated strategy, mints sessions through the session manager, and maps
//! the internal error taxonomy to the public one: every failure that would
//! reveal whether an identifier exists collapses into one generic outcome,
//! and internal faults fail closed.

use std::sync::Arc;

use tracing::info;

use super::error::{AuthError, AuthFailure};
use super::federated::FederatedStrategy;
use super::local::LocalStrategy;
use super::password::CredentialHasher;
use super::provider::{ProviderRegistry, RedirectDirective};
use super::session::{IssuedSession, SessionManager};
use crate::config::Config;
use crate::store::{Account, AccountStore, ProfileHints, SessionStore};

/// Credentials presented to [`AuthGateway::authenticate`].
#[derive(Debug, Clone)]
pub enum Credentials {
    /// Identifier + secret for a local account.
    Local { identifier: String, secret: String },
    /// Provider-asserted identity, already verified by the provider
    /// integration.
    Federated {
        provider: String,
        external_id: String,
        hints: ProfileHints,
    },
}

pub struct AuthGateway {
    local: LocalStrategy,
    federated: FederatedStrategy,
    sessions: SessionManager,
    accounts: Arc<dyn AccountStore>,
    providers: ProviderRegistry,
}

impl AuthGateway {
    #[must_use]
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        session_store: Arc<dyn SessionStore>,
        hasher: Arc<dyn CredentialHasher>,
        providers: ProviderRegistry,
        session_ttl_seconds: i64,
    ) -> Self {
        Self {
            local: LocalStrategy::new(hasher, Arc::clone(&accounts)),
            federated: FederatedStrategy::new(Arc::clone(&accounts)),
            sessions: SessionManager::new(session_store, session_ttl_seconds),
            accounts,
            providers,
        }
    }

    /// Assemble a gateway from configuration (hasher policy, session TTL,
    /// federated providers) and injected stores.
    #[must_use]
    pub fn from_config(
        config: &Config,
        accounts: Arc<dyn AccountStore>,
        session_store: Arc<dyn SessionStore>,
    ) -> Self {
        Self::new(
            accounts,
            session_store,
            config.hasher_policy.build(),
            config.provider_registry(),
            config.session_ttl,
        )
    }

    /// Register a local account.
    ///
    /// Establishes credentials only: no session is issued until an explicit
    /// [`login`](Self::login).
    #[tracing::instrument(skip(self, secret))]
    pub async fn register(&self, identifier: &str, secret: &str) -> Result<Account, AuthFailure> {
        Ok(self.local.register(identifier, secret).await?)
    }

    /// Authenticate a local identifier + secret, minting a session.
    ///
    /// Unknown identifiers, wrong secrets, and federated-only accounts are
    /// indistinguishable in the returned failure.
    #[tracing::instrument(skip(self, secret))]
    pub async fn login(&self, identifier: &str, secret: &str) -> Result<IssuedSession, AuthFailure> {
        let account = self.local.login(identifier, secret).await?;
        let session = self.sessions.issue(account.id).await?;
        info!(account_id = %account.id, "Local login succeeded");
        Ok(session)
    }

    /// Authenticate either kind of credential.
    pub async fn authenticate(
        &self,
        credentials: Credentials,
    ) -> Result<IssuedSession, AuthFailure> {
        match credentials {
            Credentials::Local { identifier, secret } => self.login(&identifier, &secret).await,
            Credentials::Federated {
                provider,
                external_id,
                hints,
            } => {
                self.complete_federated_login(&provider, &external_id, &hints)
                    .await
            }
        }
    }

    /// Begin a federated login.
    ///
    /// Returns the provider's redirect directive, opaque to this core; the
    /// web layer sends the user agent there and holds on to `state`.
    pub fn start_federated_login(&self, provider: &str) -> Result<RedirectDirective, AuthFailure> {
        self.providers
            .authorize_redirect(provider)
            .ok_or_else(|| AuthFailure::UnknownProvider(provider.to_owned()))
    }

    /// Complete a federated login with a provider-asserted identity, minting
    /// a session for the resolved account.
    #[tracing::instrument(skip(self, hints))]
    pub async fn complete_federated_login(
        &self,
        provider: &str,
        external_id: &str,
        hints: &ProfileHints,
    ) -> Result<IssuedSession, AuthFailure> {
        let account = self
            .federated
            .complete_login(provider, external_id, hints)
            .await?;
        let session = self.sessions.issue(account.id).await?;
        info!(account_id = %account.id, provider = %provider, "Federated login succeeded");
        Ok(session)
    }

    /// Whether a token is a currently valid session.
    pub async fn is_authenticated(&self, token: &str) -> Result<bool, AuthFailure> {
        Ok(self.sessions.validate(token).await?.is_some())
    }

    /// Resolve a token to its account.
    ///
    /// `Ok(None)` is the normal unauthenticated state, not a failure.
    pub async fn current_account(&self, token: &str) -> Result<Option<Account>, AuthFailure> {
        let Some(account_id) = self.sessions.validate(token).await? else {
            return Ok(None);
        };
        let account = self
            .accounts
            .find_by_id(account_id)
            .await
            .map_err(AuthError::Store)?;
        Ok(account)
    }

    /// Invalidate a session. Idempotent; unknown tokens are a no-op.
    pub async fn logout(&self, token: &str) -> Result<(), AuthFailure> {
        self.sessions.revoke(token).await?;
        Ok(())
    }

    /// Invalidate every session of the token's account ("log out
    /// everywhere"). An unknown token is a no-op returning 0.
    pub async fn logout_all(&self, token: &str) -> Result<u64, AuthFailure> {
        let Some(account_id) = self.sessions.validate(token).await? else {
            return Ok(0);
        };
        Ok(self.sessions.revoke_all_for_account(account_id).await?)
    }

    /// Remove expired session records (background sweep).
    pub async fn purge_expired_sessions(&self) -> Result<u64, AuthFailure> {
        Ok(self.sessions.purge_expired().await?)
    }
}
