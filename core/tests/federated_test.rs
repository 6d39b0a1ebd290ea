//! Federated login integration tests.
//!
//! Tests for the federated identity path:
//! - find-or-create resolution through the gateway
//! - authorization redirect directives from the provider registry
//! - accounts that never hold a local credential
//!
//! Run with: `cargo test --test federated_test`

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use hallpass_core::auth::{
    AuthError, AuthFailure, AuthGateway, HasherPolicy, LocalStrategy, ProviderConfig,
    ProviderRegistry,
};
use hallpass_core::config::Config;
use hallpass_core::store::{
    Account, AccountStore, MemoryAccountStore, MemorySessionStore, ProfileHints, StoreResult,
};
use url::Url;
use uuid::Uuid;

fn registry() -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();
    registry.register(ProviderConfig::google(
        "client-123",
        "http://localhost:8080/auth/callback",
    ));
    registry
}

fn gateway() -> AuthGateway {
    AuthGateway::new(
        Arc::new(MemoryAccountStore::new()),
        Arc::new(MemorySessionStore::new()),
        HasherPolicy::Adaptive.build(),
        registry(),
        3600,
    )
}

// ============================================================================
// Federated login through the gateway
// ============================================================================

#[tokio::test]
async fn repeat_assertions_resolve_to_one_account() {
    let gateway = gateway();

    let first = gateway
        .complete_federated_login("google", "g-999", &ProfileHints::default())
        .await
        .expect("First federated login should succeed");
    let second = gateway
        .complete_federated_login("google", "g-999", &ProfileHints::default())
        .await
        .expect("Repeat federated login should succeed");

    assert_eq!(first.account_id, second.account_id);

    // The account never acquires a local credential
    let account = gateway
        .current_account(&second.token)
        .await
        .unwrap()
        .expect("Session should resolve");
    assert!(account.credential_verifier.is_none());
    assert!(account.identifier.is_none());
    assert_eq!(account.external_id("google"), Some("g-999"));
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_first_logins_share_the_account() {
    let gateway = Arc::new(gateway());

    let a = tokio::spawn({
        let gateway = Arc::clone(&gateway);
        async move {
            gateway
                .complete_federated_login("google", "g-1", &ProfileHints::default())
                .await
        }
    });
    let b = tokio::spawn({
        let gateway = Arc::clone(&gateway);
        async move {
            gateway
                .complete_federated_login("google", "g-1", &ProfileHints::default())
                .await
        }
    });

    let a = a.await.unwrap().expect("Login should succeed");
    let b = b.await.unwrap().expect("Login should succeed");
    assert_eq!(a.account_id, b.account_id);
}

#[tokio::test]
async fn federated_rejects_empty_assertion_fields() {
    let gateway = gateway();

    let result = gateway
        .complete_federated_login("", "g-1", &ProfileHints::default())
        .await;
    assert!(matches!(result, Err(AuthFailure::Validation(_))));

    let result = gateway
        .complete_federated_login("google", "", &ProfileHints::default())
        .await;
    assert!(matches!(result, Err(AuthFailure::Validation(_))));
}

#[tokio::test]
async fn local_and_federated_accounts_stay_distinct() {
    let gateway = gateway();

    let local = gateway.register("a@x.com", "hunter2").await.unwrap();
    let federated = gateway
        .complete_federated_login("google", "g-5", &ProfileHints::default())
        .await
        .unwrap();

    assert_ne!(local.id, federated.account_id);
}

// ============================================================================
// Authorization redirects
// ============================================================================

#[tokio::test]
async fn start_federated_login_builds_redirect() {
    let gateway = gateway();

    let directive = gateway
        .start_federated_login("google")
        .expect("Configured provider should yield a redirect");
    assert_eq!(directive.provider, "google");

    let url = Url::parse(&directive.url).expect("Redirect URL should parse");
    let params: HashMap<_, _> = url.query_pairs().into_owned().collect();
    assert_eq!(params.get("client_id").map(String::as_str), Some("client-123"));
    assert_eq!(params.get("response_type").map(String::as_str), Some("code"));
    assert_eq!(
        params.get("redirect_uri").map(String::as_str),
        Some("http://localhost:8080/auth/callback")
    );
    assert_eq!(params.get("state").map(String::as_str), Some(directive.state.as_str()));
}

#[tokio::test]
async fn redirect_states_are_fresh_per_flow() {
    let gateway = gateway();

    let first = gateway.start_federated_login("google").unwrap();
    let second = gateway.start_federated_login("google").unwrap();
    assert_ne!(first.state, second.state);
}

#[tokio::test]
async fn unknown_provider_is_a_typed_failure() {
    let gateway = gateway();

    let result = gateway.start_federated_login("myspace");
    assert_eq!(
        result.unwrap_err(),
        AuthFailure::UnknownProvider("myspace".into())
    );
}

#[tokio::test]
async fn gateway_assembles_from_config() {
    let config = Config::default_for_test();
    assert!(config.has_federated());
    assert_eq!(config.provider_registry().names(), vec!["google"]);

    let gateway = AuthGateway::from_config(
        &config,
        Arc::new(MemoryAccountStore::new()),
        Arc::new(MemorySessionStore::new()),
    );

    // default_for_test configures Google only
    assert!(gateway.start_federated_login("google").is_ok());
    assert!(gateway.start_federated_login("github").is_err());
}

// ============================================================================
// Federated-only accounts and local login
// ============================================================================

/// Store stub serving one federated account that also carries an identifier
/// (as a directory import might), but no credential verifier.
struct FederatedOnlyStore {
    account: Account,
}

impl FederatedOnlyStore {
    fn new() -> Self {
        let now = Utc::now();
        Self {
            account: Account {
                id: Uuid::now_v7(),
                identifier: Some("fed@x.com".into()),
                credential_verifier: None,
                external_identities: HashMap::from([("google".to_owned(), "g-77".to_owned())]),
                display_name: None,
                email: None,
                avatar_url: None,
                created_at: now,
                updated_at: now,
            },
        }
    }
}

#[async_trait]
impl AccountStore for FederatedOnlyStore {
    async fn find_by_identifier(&self, identifier: &str) -> StoreResult<Option<Account>> {
        Ok((self.account.identifier.as_deref() == Some(identifier))
            .then(|| self.account.clone()))
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Account>> {
        Ok((self.account.id == id).then(|| self.account.clone()))
    }

    async fn create_local(&self, _: &str, _: &str) -> StoreResult<Account> {
        unimplemented!("not exercised")
    }

    async fn find_or_create_by_external_id(
        &self,
        _: &str,
        _: &str,
        _: &ProfileHints,
    ) -> StoreResult<Account> {
        unimplemented!("not exercised")
    }

    async fn link_external_identity(&self, _: Uuid, _: &str, _: &str) -> StoreResult<Account> {
        unimplemented!("not exercised")
    }
}

#[tokio::test]
async fn federated_only_account_cannot_login_locally() {
    let store: Arc<dyn AccountStore> = Arc::new(FederatedOnlyStore::new());

    // The strategy reports the precise cause...
    let strategy = LocalStrategy::new(HasherPolicy::Adaptive.build(), Arc::clone(&store));
    let result = strategy.login("fed@x.com", "anything").await;
    assert!(matches!(result, Err(AuthError::NoLocalCredential)));

    // ...and the gateway collapses it into the generic failure
    let gateway = AuthGateway::new(
        store,
        Arc::new(MemorySessionStore::new()),
        HasherPolicy::Adaptive.build(),
        ProviderRegistry::new(),
        3600,
    );
    let result = gateway.login("fed@x.com", "anything").await;
    assert_eq!(result.unwrap_err(), AuthFailure::AuthenticationFailed);
}
