//! Federated Identity Strategy
//!
//! Resolves a provider-asserted identity to an account. The OAuth2/OIDC
//! dance (code exchange, signature and state verification) happens in the
//! provider-integration collaborator before this strategy is invoked; an
//! assertion arriving here is already trusted. No password is ever seen.

use std::sync::Arc;

use tracing::debug;

use super::error::{AuthError, AuthResult};
use crate::store::{Account, AccountStore, ProfileHints};

pub struct FederatedStrategy {
    accounts: Arc<dyn AccountStore>,
}

impl FederatedStrategy {
    #[must_use]
    pub fn new(accounts: Arc<dyn AccountStore>) -> Self {
        Self { accounts }
    }

    /// Resolve `(provider, external_id)` to its account, creating one on
    /// first login.
    ///
    /// Idempotent: a provider re-asserting the same identity resolves to the
    /// same account every time. `hints` only matter on the creating call.
    pub async fn complete_login(
        &self,
        provider: &str,
        external_id: &str,
        hints: &ProfileHints,
    ) -> AuthResult<Account> {
        if provider.is_empty() {
            return Err(AuthError::Validation("provider must not be empty".into()));
        }
        if external_id.is_empty() {
            return Err(AuthError::Validation("external id must not be empty".into()));
        }

        let account = self
            .accounts
            .find_or_create_by_external_id(provider, external_id, hints)
            .await?;

        debug!(account_id = %account.id, provider = %provider, "Federated identity resolved");
        Ok(account)
    }
}
