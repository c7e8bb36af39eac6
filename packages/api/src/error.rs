//! # Error taxonomy
//!
//! Three layers of errors:
//!
//! - [`StoreError`]: what an identity or profile store reports. Stores only
//!   distinguish a uniqueness violation from "could not complete the call".
//! - [`AssertionError`]: what a federated assertion verifier reports.
//! - [`AuthError`]: what an auth flow reports to its caller. Every upstream
//!   failure is translated into exactly one variant here, and
//!   [`AuthError::public_message`] is the only text that may cross the HTTP
//!   boundary.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::error::Elapsed;

/// Failure reported by an identity or profile store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// A record with the same unique key is already present.
    #[error("record already exists")]
    AlreadyExists,
    /// The store could not be reached or rejected the call.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<Elapsed> for StoreError {
    fn from(_: Elapsed) -> Self {
        StoreError::Unavailable("upstream call timed out".to_string())
    }
}

#[cfg(feature = "server")]
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err.as_database_error() {
            Some(db) if db.is_unique_violation() => StoreError::AlreadyExists,
            _ => StoreError::Unavailable(err.to_string()),
        }
    }
}

/// Failure reported by a federated assertion verifier.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AssertionError {
    /// The assertion is malformed, forged, expired, or for another audience.
    #[error("invalid assertion: {0}")]
    Invalid(String),
    /// The verifier could not fetch what it needs to decide.
    #[error("verifier unavailable: {0}")]
    Unavailable(String),
}

impl From<Elapsed> for AssertionError {
    fn from(_: Elapsed) -> Self {
        AssertionError::Unavailable("upstream call timed out".to_string())
    }
}

/// Errors produced by the auth flows.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),

    #[error("email already in use")]
    EmailAlreadyInUse,

    #[error("invalid credential")]
    InvalidCredential,

    #[error("invalid or expired session")]
    InvalidSession,

    #[error("invalid assertion: {0}")]
    InvalidAssertion(String),

    #[error("not found")]
    NotFound,

    #[error("identity store unavailable: {0}")]
    IdentityStoreUnavailable(#[source] StoreError),

    #[error("profile store unavailable: {0}")]
    ProfileStoreUnavailable(#[source] StoreError),

    #[error("assertion verifier unavailable: {0}")]
    AssertionVerifierUnavailable(String),

    #[error("signing configuration error: {0}")]
    SigningConfiguration(String),
}

impl AuthError {
    /// A required request field is absent or blank.
    pub fn missing(field: &str) -> Self {
        AuthError::Validation(format!("{field} is required"))
    }

    /// Message safe to return to a client. Never carries upstream detail.
    pub fn public_message(&self) -> String {
        match self {
            AuthError::Validation(message) => message.clone(),
            AuthError::EmailAlreadyInUse => "Email already in use".to_string(),
            AuthError::InvalidCredential => "Invalid email or password".to_string(),
            AuthError::InvalidSession => "Invalid or expired token".to_string(),
            AuthError::InvalidAssertion(_) => "Invalid token".to_string(),
            AuthError::NotFound => "Not found".to_string(),
            AuthError::IdentityStoreUnavailable(_)
            | AuthError::ProfileStoreUnavailable(_)
            | AuthError::AssertionVerifierUnavailable(_)
            | AuthError::SigningConfiguration(_) => "Internal server error".to_string(),
        }
    }

    /// Whether the failure originates upstream rather than in the request.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            AuthError::IdentityStoreUnavailable(_)
                | AuthError::ProfileStoreUnavailable(_)
                | AuthError::AssertionVerifierUnavailable(_)
                | AuthError::SigningConfiguration(_)
        )
    }
}

/// Run an upstream call with a deadline, turning expiry into the call's own
/// "unavailable" error.
pub async fn bounded<T, E, F>(limit: Duration, call: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: From<Elapsed>,
{
    tokio::time::timeout(limit, call).await.map_err(E::from)?
}
