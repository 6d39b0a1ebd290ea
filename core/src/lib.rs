//! Hallpass Core
//!
//! Embeddable authentication and credential-management subsystem: credential
//! hashing, account and session store contracts with in-memory and
//! `PostgreSQL` backends, local + federated login strategies, and the
//! [`auth::AuthGateway`] façade a web layer drives.
//!
//! The crate deliberately has no HTTP surface. Transport, page rendering,
//! and the OAuth2 code exchange are collaborators that call in through the
//! gateway and act on its typed results.

pub mod auth;
pub mod config;
pub mod store;
