//! Store Models

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Account model.
///
/// An account is meaningful only with a local credential (`identifier` +
/// `credential_verifier`) or at least one external identity; the store
/// creation paths enforce that. Carrying both is valid and is what a later
/// "link another identity" flow produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    /// Local login identifier. Unique among accounts that define it.
    pub identifier: Option<String>,
    /// Hasher output for the local credential. Never the plaintext secret,
    /// and never serialized out of the crate.
    #[serde(skip_serializing, default)]
    pub credential_verifier: Option<String>,
    /// Provider name -> provider-assigned external id.
    pub external_identities: HashMap<String, String>,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Whether the account can be logged into with a local secret.
    #[must_use]
    pub const fn has_local_credential(&self) -> bool {
        self.identifier.is_some() && self.credential_verifier.is_some()
    }

    /// The external id this account holds for `provider`, if any.
    #[must_use]
    pub fn external_id(&self, provider: &str) -> Option<&str> {
        self.external_identities.get(provider).map(String::as_str)
    }
}

/// Advisory profile fields asserted by a federated provider.
///
/// Applied once, when the account is first created. Repeat logins do not
/// refresh them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileHints {
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
}

/// Session record.
#[derive(Debug, Clone, FromRow)]
pub struct SessionRecord {
    /// Session ID.
    pub id: Uuid,
    /// Account this session authenticates.
    pub account_id: Uuid,
    /// SHA-256 hex of the issued token. The raw token is never persisted.
    pub token_hash: String,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// Absolute expiry.
    pub expires_at: DateTime<Utc>,
}
