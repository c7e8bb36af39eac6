//! HTTP server for the quiz app's auth endpoints.
//!
//! [`routes::router`] builds the axum router over an [`AppState`]; the binary
//! in `main.rs` loads [`settings::Settings`], wires the Postgres-backed state
//! and serves it.

pub mod error;
pub mod routes;
pub mod settings;
pub mod state;

pub use routes::router;
pub use state::AppState;
