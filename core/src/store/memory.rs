//! In-Memory Store Backends
//!
//! Concurrent-map backends for tests and single-process embeddings. The
//! uniqueness guarantees hinge on the `DashMap` entry API: a vacant entry
//! holds its shard lock until the insert lands, which makes insert-if-absent
//! atomic without a separate check-then-act step.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use super::{
    Account, AccountStore, ProfileHints, SessionRecord, SessionStore, StoreError, StoreResult,
};

/// In-memory [`AccountStore`].
#[derive(Default)]
pub struct MemoryAccountStore {
    accounts: DashMap<Uuid, Account>,
    by_identifier: DashMap<String, Uuid>,
    by_external_id: DashMap<(String, String), Uuid>,
}

impl MemoryAccountStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn find_by_identifier(&self, identifier: &str) -> StoreResult<Option<Account>> {
        let Some(id) = self.by_identifier.get(identifier).map(|entry| *entry) else {
            return Ok(None);
        };
        Ok(self.accounts.get(&id).map(|entry| entry.clone()))
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Account>> {
        Ok(self.accounts.get(&id).map(|entry| entry.clone()))
    }

    async fn create_local(
        &self,
        identifier: &str,
        credential_verifier: &str,
    ) -> StoreResult<Account> {
        match self.by_identifier.entry(identifier.to_owned()) {
            Entry::Occupied(_) => Err(StoreError::DuplicateIdentifier),
            Entry::Vacant(slot) => {
                let now = Utc::now();
                let account = Account {
                    id: Uuid::now_v7(),
                    identifier: Some(identifier.to_owned()),
                    credential_verifier: Some(credential_verifier.to_owned()),
                    external_identities: HashMap::new(),
                    display_name: None,
                    email: None,
                    avatar_url: None,
                    created_at: now,
                    updated_at: now,
                };
                self.accounts.insert(account.id, account.clone());
                slot.insert(account.id);
                Ok(account)
            }
        }
    }

    async fn find_or_create_by_external_id(
        &self,
        provider: &str,
        external_id: &str,
        hints: &ProfileHints,
    ) -> StoreResult<Account> {
        match self
            .by_external_id
            .entry((provider.to_owned(), external_id.to_owned()))
        {
            Entry::Occupied(slot) => {
                let id = *slot.get();
                self.accounts
                    .get(&id)
                    .map(|entry| entry.clone())
                    .ok_or_else(|| {
                        StoreError::Backend("identity index points at a missing account".into())
                    })
            }
            Entry::Vacant(slot) => {
                let now = Utc::now();
                let mut account = Account {
                    id: Uuid::now_v7(),
                    identifier: None,
                    credential_verifier: None,
                    external_identities: HashMap::new(),
                    display_name: hints.display_name.clone(),
                    email: hints.email.clone(),
                    avatar_url: hints.avatar_url.clone(),
                    created_at: now,
                    updated_at: now,
                };
                account
                    .external_identities
                    .insert(provider.to_owned(), external_id.to_owned());
                self.accounts.insert(account.id, account.clone());
                slot.insert(account.id);
                Ok(account)
            }
        }
    }

    async fn link_external_identity(
        &self,
        account_id: Uuid,
        provider: &str,
        external_id: &str,
    ) -> StoreResult<Account> {
        match self
            .by_external_id
            .entry((provider.to_owned(), external_id.to_owned()))
        {
            Entry::Occupied(_) => Err(StoreError::DuplicateExternalIdentity),
            Entry::Vacant(slot) => {
                let Some(mut account) = self.accounts.get_mut(&account_id) else {
                    return Err(StoreError::AccountNotFound);
                };
                account
                    .external_identities
                    .insert(provider.to_owned(), external_id.to_owned());
                account.updated_at = Utc::now();
                let snapshot = account.clone();
                drop(account);
                slot.insert(account_id);
                Ok(snapshot)
            }
        }
    }
}

/// In-memory [`SessionStore`], keyed by token hash.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: DashMap<String, SessionRecord>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn insert(&self, record: SessionRecord) -> StoreResult<()> {
        self.sessions.insert(record.token_hash.clone(), record);
        Ok(())
    }

    async fn find_valid(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<SessionRecord>> {
        Ok(self
            .sessions
            .get(token_hash)
            .map(|entry| entry.clone())
            .filter(|record| record.expires_at > now))
    }

    async fn delete(&self, token_hash: &str) -> StoreResult<()> {
        self.sessions.remove(token_hash);
        Ok(())
    }

    async fn delete_all_for_account(&self, account_id: Uuid) -> StoreResult<u64> {
        let before = self.sessions.len();
        self.sessions.retain(|_, record| record.account_id != account_id);
        Ok((before - self.sessions.len()) as u64)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let before = self.sessions.len();
        self.sessions.retain(|_, record| record.expires_at > now);
        Ok((before - self.sessions.len()) as u64)
    }
}
