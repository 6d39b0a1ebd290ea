//! `PostgreSQL` Store Backends
//!
//! Runtime queries (no compile-time `DATABASE_URL` required). Uniqueness is
//! enforced by the database: a unique index on `accounts.identifier` and the
//! composite primary key on `account_identities (provider, external_id)`.
//! Schema lives in `migrations/`.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use tracing::{error, info};
use uuid::Uuid;

use super::{
    Account, AccountStore, ProfileHints, SessionRecord, SessionStore, StoreError, StoreResult,
};

/// Log and return a database error with context.
macro_rules! db_error {
    ($query:expr, $($field:tt)*) => {
        |e| {
            error!(query = $query, $($field)*, error = %e, "Database query failed");
            e
        }
    };
}

/// Create a `PostgreSQL` connection pool with health configuration.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        // Keep a couple of connections warm to avoid cold-start latency
        .min_connections(2)
        .max_connections(10)
        // Prevent hanging requests on pool exhaustion
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(600))
        // Validate connections before use to catch stale ones
        .test_before_acquire(true)
        .connect(database_url)
        .await?;

    info!("Connected to PostgreSQL");
    Ok(pool)
}

/// Run database migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("Database migrations completed");
    Ok(())
}

/// Account row without its identities.
#[derive(Debug, FromRow)]
struct AccountRow {
    id: Uuid,
    identifier: Option<String>,
    credential_verifier: Option<String>,
    display_name: Option<String>,
    email: Option<String>,
    avatar_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct IdentityRow {
    provider: String,
    external_id: String,
}

impl AccountRow {
    fn into_account(self, identities: Vec<IdentityRow>) -> Account {
        Account {
            id: self.id,
            identifier: self.identifier,
            credential_verifier: self.credential_verifier,
            external_identities: identities
                .into_iter()
                .map(|row| (row.provider, row.external_id))
                .collect(),
            display_name: self.display_name,
            email: self.email,
            avatar_url: self.avatar_url,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// [`AccountStore`] backed by `PostgreSQL`.
#[derive(Clone)]
pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_identities(&self, account_id: Uuid) -> sqlx::Result<Vec<IdentityRow>> {
        sqlx::query_as::<_, IdentityRow>(
            "SELECT provider, external_id FROM account_identities WHERE account_id = $1",
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn assemble(&self, row: AccountRow) -> StoreResult<Account> {
        let identities = self
            .load_identities(row.id)
            .await
            .map_err(db_error!("load_identities", account_id = %row.id))?;
        Ok(row.into_account(identities))
    }

    async fn find_by_external_id(
        &self,
        provider: &str,
        external_id: &str,
    ) -> StoreResult<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>(
            r"
            SELECT a.*
            FROM accounts a
            JOIN account_identities i ON i.account_id = a.id
            WHERE i.provider = $1 AND i.external_id = $2
            ",
        )
        .bind(provider)
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error!("find_by_external_id", provider = %provider))?;

        match row {
            Some(row) => Ok(Some(self.assemble(row).await?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn find_by_identifier(&self, identifier: &str) -> StoreResult<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>("SELECT * FROM accounts WHERE identifier = $1")
            .bind(identifier)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error!("find_by_identifier", identifier = %identifier))?;

        match row {
            Some(row) => Ok(Some(self.assemble(row).await?)),
            None => Ok(None),
        }
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>("SELECT * FROM accounts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error!("find_by_id", account_id = %id))?;

        match row {
            Some(row) => Ok(Some(self.assemble(row).await?)),
            None => Ok(None),
        }
    }

    async fn create_local(
        &self,
        identifier: &str,
        credential_verifier: &str,
    ) -> StoreResult<Account> {
        let inserted = sqlx::query_as::<_, AccountRow>(
            r"
            INSERT INTO accounts (identifier, credential_verifier)
            VALUES ($1, $2)
            RETURNING *
            ",
        )
        .bind(identifier)
        .bind(credential_verifier)
        .fetch_one(&self.pool)
        .await;

        match inserted {
            Ok(row) => Ok(row.into_account(Vec::new())),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(StoreError::DuplicateIdentifier)
            }
            Err(e) => {
                error!(query = "create_local", error = %e, "Database query failed");
                Err(e.into())
            }
        }
    }

    async fn find_or_create_by_external_id(
        &self,
        provider: &str,
        external_id: &str,
        hints: &ProfileHints,
    ) -> StoreResult<Account> {
        // Fast path: the identity is already claimed.
        if let Some(account) = self.find_by_external_id(provider, external_id).await? {
            return Ok(account);
        }

        // Create the account and claim the identity in one transaction. If a
        // concurrent caller claims the pair first, the ON CONFLICT insert
        // reports zero rows, the transaction rolls back (dropping the fresh
        // account), and the winner's account is re-read.
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error!("find_or_create_begin", provider = %provider))?;

        let row = sqlx::query_as::<_, AccountRow>(
            r"
            INSERT INTO accounts (display_name, email, avatar_url)
            VALUES ($1, $2, $3)
            RETURNING *
            ",
        )
        .bind(hints.display_name.as_deref())
        .bind(hints.email.as_deref())
        .bind(hints.avatar_url.as_deref())
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error!("find_or_create_insert_account", provider = %provider))?;

        let claimed = sqlx::query(
            r"
            INSERT INTO account_identities (account_id, provider, external_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (provider, external_id) DO NOTHING
            ",
        )
        .bind(row.id)
        .bind(provider)
        .bind(external_id)
        .execute(&mut *tx)
        .await
        .map_err(db_error!("find_or_create_claim_identity", provider = %provider))?;

        if claimed.rows_affected() == 0 {
            tx.rollback()
                .await
                .map_err(db_error!("find_or_create_rollback", provider = %provider))?;
            return match self.find_by_external_id(provider, external_id).await? {
                Some(account) => Ok(account),
                None => Err(StoreError::Backend(
                    "lost the find-or-create race but the winning account is missing".into(),
                )),
            };
        }

        tx.commit()
            .await
            .map_err(db_error!("find_or_create_commit", provider = %provider))?;

        let mut account = row.into_account(Vec::new());
        account
            .external_identities
            .insert(provider.to_owned(), external_id.to_owned());
        Ok(account)
    }

    async fn link_external_identity(
        &self,
        account_id: Uuid,
        provider: &str,
        external_id: &str,
    ) -> StoreResult<Account> {
        let claimed = sqlx::query(
            r"
            INSERT INTO account_identities (account_id, provider, external_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (provider, external_id) DO NOTHING
            ",
        )
        .bind(account_id)
        .bind(provider)
        .bind(external_id)
        .execute(&self.pool)
        .await;

        match claimed {
            Ok(result) if result.rows_affected() == 0 => {
                Err(StoreError::DuplicateExternalIdentity)
            }
            Ok(_) => {
                sqlx::query("UPDATE accounts SET updated_at = NOW() WHERE id = $1")
                    .bind(account_id)
                    .execute(&self.pool)
                    .await
                    .map_err(db_error!("link_touch_account", account_id = %account_id))?;
                self.find_by_id(account_id)
                    .await?
                    .ok_or(StoreError::AccountNotFound)
            }
            Err(sqlx::Error::Database(db_err)) if db_err.is_foreign_key_violation() => {
                Err(StoreError::AccountNotFound)
            }
            Err(e) => {
                error!(query = "link_external_identity", account_id = %account_id, error = %e, "Database query failed");
                Err(e.into())
            }
        }
    }
}

/// [`SessionStore`] backed by `PostgreSQL`.
#[derive(Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn insert(&self, record: SessionRecord) -> StoreResult<()> {
        sqlx::query(
            r"
            INSERT INTO sessions (id, account_id, token_hash, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(record.id)
        .bind(record.account_id)
        .bind(&record.token_hash)
        .bind(record.created_at)
        .bind(record.expires_at)
        .execute(&self.pool)
        .await
        .map_err(db_error!("insert_session", account_id = %record.account_id))?;
        Ok(())
    }

    async fn find_valid(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<SessionRecord>> {
        Ok(sqlx::query_as::<_, SessionRecord>(
            r"
            SELECT id, account_id, token_hash, created_at, expires_at
            FROM sessions
            WHERE token_hash = $1 AND expires_at > $2
            ",
        )
        .bind(token_hash)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error!("find_valid_session", now = %now))?)
    }

    async fn delete(&self, token_hash: &str) -> StoreResult<()> {
        sqlx::query("DELETE FROM sessions WHERE token_hash = $1")
            .bind(token_hash)
            .execute(&self.pool)
            .await
            .map_err(db_error!("delete_session", query_kind = "by_token_hash"))?;
        Ok(())
    }

    async fn delete_all_for_account(&self, account_id: Uuid) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE account_id = $1")
            .bind(account_id)
            .execute(&self.pool)
            .await
            .map_err(db_error!("delete_all_account_sessions", account_id = %account_id))?;
        Ok(result.rows_affected())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at < $1")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(db_error!("purge_expired_sessions", now = %now))?;
        Ok(result.rows_affected())
    }
}
