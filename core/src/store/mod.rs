//! Account and Session Stores
//!
//! Persistence contracts for the authentication core plus the two shipped
//! backends: in-memory (tests, single-process embeddings) and `PostgreSQL`.
//! The contracts are deliberately narrow - create, find, and atomic
//! insert-if-absent - so the physical schema stays the owner's concern.

mod memory;
mod models;
mod postgres;


use async_trait::async_trait;
use chrono::{DateTime, Utc};
pub use memory::{MemoryAccountStore, MemorySessionStore};
pub use models::{Account, ProfileHints, SessionRecord};
pub use postgres::{create_pool, run_migrations, PgAccountStore, PgSessionStore};
use thiserror::Error;
use uuid::Uuid;

/// Store error taxonomy.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The identifier is already claimed by another account.
    #[error("identifier already registered")]
    DuplicateIdentifier,

    /// The `(provider, external id)` pair is already claimed.
    #[error("external identity already linked")]
    DuplicateExternalIdentity,

    /// The referenced account does not exist.
    #[error("account not found")]
    AccountNotFound,

    /// Backend infrastructure failure.
    #[error("store backend failure")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Backend(Box::new(err))
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence contract for accounts.
///
/// `create_local` and `find_or_create_by_external_id` must be race-free:
/// implementations use an atomic insert-if-absent primitive (unique index
/// plus conflict handling, or an entry lock), never a separate
/// check-then-insert.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Find an account by its local login identifier. Absent is `Ok(None)`.
    async fn find_by_identifier(&self, identifier: &str) -> StoreResult<Option<Account>>;

    /// Find an account by id. Absent is `Ok(None)`.
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Account>>;

    /// Create an account with a local credential.
    ///
    /// Exactly one concurrent caller wins for a given identifier; the rest
    /// observe [`StoreError::DuplicateIdentifier`].
    async fn create_local(
        &self,
        identifier: &str,
        credential_verifier: &str,
    ) -> StoreResult<Account>;

    /// Return the account owning `(provider, external_id)`, creating it if
    /// absent.
    ///
    /// Exactly one account ever exists for a given pair, even under
    /// concurrent first-time logins; every caller observes that account.
    /// `hints` are applied only when the account is created by this call.
    async fn find_or_create_by_external_id(
        &self,
        provider: &str,
        external_id: &str,
        hints: &ProfileHints,
    ) -> StoreResult<Account>;

    /// Attach an external identity to an existing account.
    async fn link_external_identity(
        &self,
        account_id: Uuid,
        provider: &str,
        external_id: &str,
    ) -> StoreResult<Account>;
}

/// Persistence contract for sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persist a new session record.
    async fn insert(&self, record: SessionRecord) -> StoreResult<()>;

    /// Find a session by token hash. Records with `expires_at <= now` are
    /// unreachable here even before they are physically purged.
    async fn find_valid(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<SessionRecord>>;

    /// Delete a session by token hash. Unknown hashes are a no-op.
    async fn delete(&self, token_hash: &str) -> StoreResult<()>;

    /// Delete every session for an account, returning the count removed.
    async fn delete_all_for_account(&self, account_id: Uuid) -> StoreResult<u64>;

    /// Physically remove expired records, returning the count removed.
    async fn purge_expired(&self, now: DateTime<Utc>) -> StoreResult<u64>;
}
