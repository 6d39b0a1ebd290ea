//! Authentication Core
//!
//! Credential hashing, local and federated login strategies, session
//! lifecycle, and the [`AuthGateway`] façade an external web layer calls.

mod error;
mod federated;
mod gateway;
mod local;
mod password;
mod provider;
mod session;

pub use error::{AuthError, AuthFailure, AuthResult};
pub use federated::FederatedStrategy;
pub use gateway::{AuthGateway, Credentials};
pub use local::LocalStrategy;
pub use password::{
    AdaptiveHasher, CredentialHasher, HashError, HasherPolicy, LegacyDigestHasher,
};
pub use provider::{ProviderConfig, ProviderRegistry, RedirectDirective};
pub use session::{hash_token, IssuedSession, SessionManager};
