//! Credentials, session tokens and federated assertions.

#[cfg(feature = "server")]
mod google;
mod password;
mod session;
mod verifier;

#[cfg(feature = "server")]
pub use google::{GoogleVerifier, GOOGLE_CERTS_URL};
pub use password::{hash_password, verify_password};
pub use session::{SessionClaims, SessionIssuer, DEFAULT_SESSION_DAYS};
pub use verifier::{AssertionVerifier, FederatedClaims};
