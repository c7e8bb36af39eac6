//! # API crate: identity reconciliation and session issuance for the quiz app
//!
//! Turns a signup, login or Google sign-in into exactly one durable identity,
//! keeps a denormalized profile row for it, and issues a stateless session
//! token the client stores for later calls.
//!
//! ## Modules
//!
//! | Module | Feature gate | Purpose |
//! |--------|-------------|---------|
//! | [`auth`] | none | Argon2 password hashing, session tokens, federated assertion verification (`GoogleVerifier` needs `server`) |
//! | [`db`] | `server` | PostgreSQL pool with bounded acquisition, embedded migrations |
//! | [`error`] | none | `AuthError` taxonomy, store and verifier errors, upstream deadline helper |
//! | [`flows`] | none | `AuthService`: the signup, login and Google flows |
//! | [`identity`] | none | `IdentityStore` seam, race-safe `IdentityResolver`, Postgres and in-memory stores |
//! | [`models`] | none | `Identity`, `Profile`, request and response bodies |
//! | [`profile`] | none | `ProfileStore` seam, best-effort `ProfileSynchronizer`, Postgres and in-memory stores |
//!
//! All configuration (signing secret, OAuth client id, timeouts, pool) is
//! passed in by the caller once at startup; nothing here reads the
//! environment.

pub mod auth;
pub mod db;
pub mod error;
pub mod flows;
pub mod identity;
pub mod models;
pub mod profile;

pub use error::{AssertionError, AuthError, StoreError};
pub use flows::{AuthService, Stage};
pub use models::{AuthResponse, GoogleRequest, Identity, LoginRequest, ProfileView, SignupRequest};
