//! Federated Provider Registry
//!
//! Named OAuth2/OIDC provider configurations and the authorization-redirect
//! directives handed to the web layer. Only the authorize leg lives here:
//! the code exchange runs in the provider-integration collaborator, so the
//! registry holds no client secrets.

use std::collections::HashMap;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use tracing::error;
use url::Url;

/// Static configuration for one federated provider.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Registry key, e.g. `"google"`.
    pub name: String,
    /// OAuth2 client id.
    pub client_id: String,
    /// Authorization endpoint.
    pub authorize_url: String,
    /// Space-separated scopes.
    pub scopes: String,
    /// Callback the provider redirects back to.
    pub redirect_uri: String,
}

impl ProviderConfig {
    /// Google, with its well-known authorization endpoint.
    #[must_use]
    pub fn google(client_id: impl Into<String>, redirect_uri: impl Into<String>) -> Self {
        Self {
            name: "google".into(),
            client_id: client_id.into(),
            authorize_url: "https://accounts.google.com/o/oauth2/v2/auth".into(),
            scopes: "openid email profile".into(),
            redirect_uri: redirect_uri.into(),
        }
    }

    /// GitHub, with its well-known authorization endpoint.
    #[must_use]
    pub fn github(client_id: impl Into<String>, redirect_uri: impl Into<String>) -> Self {
        Self {
            name: "github".into(),
            client_id: client_id.into(),
            authorize_url: "https://github.com/login/oauth/authorize".into(),
            scopes: "read:user user:email".into(),
            redirect_uri: redirect_uri.into(),
        }
    }

    /// An arbitrary OAuth2 provider.
    #[must_use]
    pub fn custom(
        name: impl Into<String>,
        client_id: impl Into<String>,
        authorize_url: impl Into<String>,
        scopes: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            client_id: client_id.into(),
            authorize_url: authorize_url.into(),
            scopes: scopes.into(),
            redirect_uri: redirect_uri.into(),
        }
    }
}

/// Redirect directive for the web layer: send the user agent to `url` and
/// bind `state` to the pending flow so the callback can be CSRF-checked.
#[derive(Debug, Clone)]
pub struct RedirectDirective {
    pub provider: String,
    pub url: String,
    pub state: String,
}

/// Providers available for federated login, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, ProviderConfig>,
}

impl ProviderRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, config: ProviderConfig) {
        self.providers.insert(config.name.clone(), config);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.get(name)
    }

    /// Provider names, sorted for stable listings.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.providers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Build the authorization redirect for a provider.
    ///
    /// `None` for providers that are not registered - or whose configured
    /// endpoint does not parse, which is treated the same way (fail closed)
    /// after logging.
    #[must_use]
    pub fn authorize_redirect(&self, name: &str) -> Option<RedirectDirective> {
        let config = self.get(name)?;

        let mut url = match Url::parse(&config.authorize_url) {
            Ok(url) => url,
            Err(e) => {
                error!(provider = %config.name, error = %e, "Invalid authorization endpoint URL");
                return None;
            }
        };

        let mut state_bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut state_bytes);
        let state = URL_SAFE_NO_PAD.encode(state_bytes);

        url.query_pairs_mut()
            .append_pair("client_id", &config.client_id)
            .append_pair("redirect_uri", &config.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", &config.scopes)
            .append_pair("state", &state);

        Some(RedirectDirective {
            provider: config.name.clone(),
            url: url.to_string(),
            state,
        })
    }
}
