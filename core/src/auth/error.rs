//! Authentication Error Types

use thiserror::Error;
use tracing::error;

use super::password::HashError;
use crate::store::StoreError;

/// Internal authentication error taxonomy.
///
/// These variants stay inside the crate. The gateway maps them to
/// [`AuthFailure`] before anything reaches an untrusted caller, collapsing
/// the variants that would otherwise let a caller probe which identifiers
/// exist.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Malformed input (empty identifier, empty secret, ...).
    #[error("validation failed: {0}")]
    Validation(String),

    /// The identifier is already registered.
    #[error("identifier already registered")]
    DuplicateIdentifier,

    /// No account matches the identifier.
    #[error("account not found")]
    AccountNotFound,

    /// The secret does not match the stored verifier.
    #[error("invalid credential")]
    InvalidCredential,

    /// The account exists but has no local credential (federated-only).
    #[error("account has no local credential")]
    NoLocalCredential,

    /// The named provider is not configured.
    #[error("unknown identity provider: {0}")]
    UnknownProvider(String),

    /// Credential hashing failed. Fatal: the attempt fails closed.
    #[error("credential hashing failed")]
    Hashing(#[from] HashError),

    /// Store failure.
    #[error("store failure")]
    Store(#[from] StoreError),
}

/// Result type for internal auth operations.
pub type AuthResult<T> = Result<T, AuthError>;

/// Failure taxonomy exposed by the gateway.
///
/// `AccountNotFound`, `InvalidCredential`, and `NoLocalCredential` all
/// surface as [`AuthFailure::AuthenticationFailed`] so a caller cannot tell
/// which identifiers exist. Internal faults surface as
/// [`AuthFailure::Internal`] with the detail logged, never returned.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthFailure {
    /// Malformed input; surfaced for user correction.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The identifier is already registered.
    #[error("identifier already registered")]
    DuplicateIdentifier,

    /// Generic authentication failure. Deliberately indistinguishable for
    /// unknown identifiers, wrong secrets, and federated-only accounts.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// The named provider is not configured.
    #[error("unknown identity provider: {0}")]
    UnknownProvider(String),

    /// Internal failure. The authentication attempt fails closed.
    #[error("authentication service unavailable")]
    Internal,
}

impl From<AuthError> for AuthFailure {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Validation(msg) => Self::Validation(msg),
            AuthError::DuplicateIdentifier
            | AuthError::Store(
                StoreError::DuplicateIdentifier | StoreError::DuplicateExternalIdentity,
            ) => Self::DuplicateIdentifier,
            AuthError::AccountNotFound
            | AuthError::InvalidCredential
            | AuthError::NoLocalCredential
            | AuthError::Store(StoreError::AccountNotFound) => Self::AuthenticationFailed,
            AuthError::UnknownProvider(name) => Self::UnknownProvider(name),
            AuthError::Hashing(e) => {
                error!(error = %e, "Credential hashing failed - failing closed");
                Self::Internal
            }
            AuthError::Store(e @ StoreError::Backend(_)) => {
                error!(error = %e, "Store failure during authentication");
                Self::Internal
            }
        }
    }
}
