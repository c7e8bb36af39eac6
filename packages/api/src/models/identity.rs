//! # Identity model
//!
//! An [`Identity`] is the one typed view of an identity-store record that the
//! rest of the crate sees. Stores build it once, at their boundary; nothing
//! downstream re-reads raw store rows.
//!
//! - `id`: opaque, stable identifier assigned by the identity store.
//! - `email`: unique key, normalized to lower case before it reaches a store.
//! - `display_name`: the stored name, or the email's local part when the
//!   record has none (see [`display_name_or_email`]).

use serde::{Deserialize, Serialize};

/// Resolved identity as seen by the auth flows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    pub email: String,
    pub display_name: String,
}

/// Metadata recorded alongside a new identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityMetadata {
    pub display_name: Option<String>,
    pub federated_provider_id: Option<String>,
}

impl IdentityMetadata {
    /// Metadata for an email+password signup.
    pub fn local(display_name: impl Into<String>) -> Self {
        Self {
            display_name: Some(display_name.into()),
            federated_provider_id: None,
        }
    }

    /// Metadata for an identity first seen through a federated provider.
    pub fn federated(display_name: impl Into<String>, provider_id: impl Into<String>) -> Self {
        Self {
            display_name: Some(display_name.into()),
            federated_provider_id: Some(provider_id.into()),
        }
    }
}

/// Use the stored name if present and non-blank, else the email's local part.
pub fn display_name_or_email(name: Option<&str>, email: &str) -> String {
    match name.map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => email.split('@').next().unwrap_or(email).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_falls_back_to_local_part() {
        assert_eq!(display_name_or_email(None, "ada@example.com"), "ada");
        assert_eq!(display_name_or_email(Some("  "), "ada@example.com"), "ada");
        assert_eq!(display_name_or_email(Some("Ada L."), "ada@example.com"), "Ada L.");
    }
}
