//! # Profile synchronization
//!
//! Every identity should eventually have a row in the relational store's
//! `profiles` table. The write is an upsert keyed on the identity id, so
//! replaying it (for example a signup retried after the profile write failed
//! the first time) converges instead of conflicting.
//!
//! [`ProfileSynchronizer::sync`] never fails the caller: the identity and its
//! session token are valid without the profile row, so a failed write is
//! logged and reported as [`SyncOutcome::Deferred`].

mod memory;
#[cfg(feature = "server")]
mod postgres;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::{bounded, AuthError, StoreError};
use crate::models::{Identity, Profile};

pub use memory::MemoryProfileStore;
#[cfg(feature = "server")]
pub use postgres::PgProfileStore;

/// Relational store operations on profile rows.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Insert the profile, or refresh email and username of an existing one.
    /// `created_at` of an existing row is kept.
    async fn upsert_profile(&self, profile: &Profile) -> Result<(), StoreError>;

    async fn get_profile(&self, id: &str) -> Result<Option<Profile>, StoreError>;
}

/// Result of a best-effort profile write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Synced,
    Deferred(StoreError),
}

impl SyncOutcome {
    /// Client-facing note when the write did not land.
    pub fn warning(&self) -> Option<String> {
        match self {
            SyncOutcome::Synced => None,
            SyncOutcome::Deferred(_) => Some("Profile synchronization deferred".to_string()),
        }
    }
}

/// Keeps profile rows in step with identities.
#[derive(Clone)]
pub struct ProfileSynchronizer {
    store: Arc<dyn ProfileStore>,
    timeout: Duration,
}

impl ProfileSynchronizer {
    pub fn new(store: Arc<dyn ProfileStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Upsert the profile for `identity`. Failures are logged, not returned.
    pub async fn sync(&self, identity: &Identity) -> SyncOutcome {
        let profile = Profile {
            id: identity.id.clone(),
            email: identity.email.clone(),
            username: identity.display_name.clone(),
            created_at: Utc::now(),
        };
        match bounded(self.timeout, self.store.upsert_profile(&profile)).await {
            Ok(()) => SyncOutcome::Synced,
            Err(err) => {
                tracing::warn!(identity_id = %identity.id, error = %err, "profile sync deferred");
                SyncOutcome::Deferred(err)
            }
        }
    }

    /// Load the profile for an identity id.
    pub async fn fetch(&self, id: &str) -> Result<Profile, AuthError> {
        bounded(self.timeout, self.store.get_profile(id))
            .await
            .map_err(AuthError::ProfileStoreUnavailable)?
            .ok_or(AuthError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> Identity {
        Identity {
            id: "identity-1".to_string(),
            email: "ada@example.com".to_string(),
            display_name: "Ada".to_string(),
        }
    }

    fn synchronizer(store: Arc<MemoryProfileStore>) -> ProfileSynchronizer {
        ProfileSynchronizer::new(store, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn sync_writes_profile() {
        let store = Arc::new(MemoryProfileStore::new());
        let outcome = synchronizer(store.clone()).sync(&identity()).await;
        assert_eq!(outcome, SyncOutcome::Synced);
        assert_eq!(outcome.warning(), None);

        let profile = store.get_profile("identity-1").await.unwrap().unwrap();
        assert_eq!(profile.username, "Ada");
        assert_eq!(profile.email, "ada@example.com");
    }

    #[tokio::test]
    async fn resync_keeps_creation_time() {
        let store = Arc::new(MemoryProfileStore::new());
        let sync = synchronizer(store.clone());
        sync.sync(&identity()).await;
        let first = store.get_profile("identity-1").await.unwrap().unwrap();

        let renamed = Identity {
            display_name: "Ada Lovelace".to_string(),
            ..identity()
        };
        assert_eq!(sync.sync(&renamed).await, SyncOutcome::Synced);
        let second = store.get_profile("identity-1").await.unwrap().unwrap();
        assert_eq!(second.username, "Ada Lovelace");
        assert_eq!(second.created_at, first.created_at);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn failure_is_deferred_not_raised() {
        let store = Arc::new(MemoryProfileStore::new());
        store.set_available(false);
        let outcome = synchronizer(store.clone()).sync(&identity()).await;
        assert!(matches!(outcome, SyncOutcome::Deferred(StoreError::Unavailable(_))));
        assert!(outcome.warning().is_some());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn fetch_distinguishes_missing_from_outage() {
        let store = Arc::new(MemoryProfileStore::new());
        let sync = synchronizer(store.clone());
        assert!(matches!(sync.fetch("nobody").await, Err(AuthError::NotFound)));

        store.set_available(false);
        assert!(matches!(
            sync.fetch("nobody").await,
            Err(AuthError::ProfileStoreUnavailable(_))
        ));
    }
}
