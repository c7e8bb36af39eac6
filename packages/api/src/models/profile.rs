//! Denormalized profile row kept in the relational store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[cfg(feature = "server")]
use sqlx::FromRow;

/// Profile record keyed by the identity id.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "server", derive(FromRow))]
pub struct Profile {
    pub id: String,
    pub email: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

impl Profile {
    /// Project into the shape served by the profile endpoint.
    pub fn to_view(&self) -> ProfileView {
        ProfileView {
            username: self.username.clone(),
            email: self.email.clone(),
            joined: self.created_at,
        }
    }
}

/// Profile information safe to send to the client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileView {
    pub username: String,
    pub email: String,
    pub joined: DateTime<Utc>,
}
