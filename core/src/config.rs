//! Configuration
//!
//! Loads configuration from environment variables.

use std::env;

use anyhow::{bail, Result};

use crate::auth::{HasherPolicy, ProviderConfig, ProviderRegistry};

/// Core configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Credential hasher policy (`HASHER_POLICY`: "adaptive" or
    /// "legacy-digest"; default "adaptive").
    pub hasher_policy: HasherPolicy,

    /// Absolute session lifetime in seconds (default: 604800 = 7 days).
    pub session_ttl: i64,

    /// `PostgreSQL` connection URL (only needed for the `PostgreSQL`
    /// store backends).
    pub database_url: Option<String>,

    /// Callback URI federated providers redirect back to.
    pub oauth_redirect_uri: Option<String>,

    /// Google OAuth2 client ID (optional).
    pub google_client_id: Option<String>,

    /// GitHub OAuth2 client ID (optional).
    pub github_client_id: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let hasher_policy = match env::var("HASHER_POLICY").as_deref() {
            Err(_) | Ok("adaptive") => HasherPolicy::Adaptive,
            Ok("legacy-digest") => HasherPolicy::LegacyDigest,
            Ok(other) => bail!("unknown HASHER_POLICY: {other}"),
        };

        Ok(Self {
            hasher_policy,
            session_ttl: env::var("SESSION_TTL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(604_800),
            database_url: env::var("DATABASE_URL").ok(),
            oauth_redirect_uri: env::var("OAUTH_REDIRECT_URI").ok(),
            google_client_id: env::var("GOOGLE_CLIENT_ID").ok(),
            github_client_id: env::var("GITHUB_CLIENT_ID").ok(),
        })
    }

    /// Whether any federated provider is configured.
    #[must_use]
    pub const fn has_federated(&self) -> bool {
        self.oauth_redirect_uri.is_some()
            && (self.google_client_id.is_some() || self.github_client_id.is_some())
    }

    /// Build the provider registry from the configured providers.
    #[must_use]
    pub fn provider_registry(&self) -> ProviderRegistry {
        let mut registry = ProviderRegistry::new();
        if let Some(redirect) = &self.oauth_redirect_uri {
            if let Some(client_id) = &self.google_client_id {
                registry.register(ProviderConfig::google(client_id, redirect));
            }
            if let Some(client_id) = &self.github_client_id {
                registry.register(ProviderConfig::github(client_id, redirect));
            }
        }
        registry
    }

    /// Create a default configuration for testing.
    #[must_use]
    pub fn default_for_test() -> Self {
        Self {
            hasher_policy: HasherPolicy::Adaptive,
            session_ttl: 604_800,
            database_url: None,
            oauth_redirect_uri: Some("http://localhost:8080/auth/callback".into()),
            google_client_id: Some("test-client-id".into()),
            github_client_id: None,
        }
    }
}
