//! # Database module: PostgreSQL pool and schema
//!
//! Gated behind the `server` feature so the domain types and in-memory stores
//! build without SQLx.
//!
//! - [`connect`]: opens a pool whose connection acquisition is bounded by the
//!   configured upstream timeout, so an unreachable database fails calls
//!   instead of stalling them.
//! - [`MIGRATOR`]: the embedded `migrations/` directory (`identities`,
//!   `profiles`), run once at startup by the server binary.

#[cfg(feature = "server")]
mod pool;

#[cfg(feature = "server")]
pub use pool::{connect, MIGRATOR};
