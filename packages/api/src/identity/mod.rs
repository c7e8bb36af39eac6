//! # Identity resolution
//!
//! [`IdentityStore`] is the seam to the system of record for credentials and
//! email uniqueness. [`IdentityResolver`] is the only code that decides
//! whether an identity exists and creates it when it does not.
//!
//! ## Race policy
//!
//! The store's uniqueness constraint on `email` is the arbiter. Two resolvers
//! that both observe "not found" both attempt creation; the loser gets
//! [`StoreError::AlreadyExists`], re-queries once and returns the winner's
//! identity with `is_new = false`. Callers never see two ids for one email.

mod memory;
#[cfg(feature = "server")]
mod postgres;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{bounded, AuthError, StoreError};
use crate::models::{Identity, IdentityMetadata};

pub use memory::MemoryIdentityStore;
#[cfg(feature = "server")]
pub use postgres::PgIdentityStore;

/// Identity store operations the auth flows depend on.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Find the identity registered under `email`.
    async fn lookup_by_email(&self, email: &str) -> Result<Option<Identity>, StoreError>;

    /// Create an identity. Fails with [`StoreError::AlreadyExists`] when the
    /// email is taken. `password` is hashed by the store; federated
    /// identities have none.
    async fn create(
        &self,
        email: &str,
        password: Option<&str>,
        metadata: &IdentityMetadata,
    ) -> Result<Identity, StoreError>;

    /// Return the identity if `password` matches the one stored for `email`.
    /// Unknown emails and passwordless identities yield `Ok(None)`.
    async fn verify_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<Identity>, StoreError>;
}

/// Outcome of [`IdentityResolver::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub identity: Identity,
    pub is_new: bool,
}

/// Find-or-create over an [`IdentityStore`], safe under concurrent callers.
#[derive(Clone)]
pub struct IdentityResolver {
    store: Arc<dyn IdentityStore>,
    timeout: Duration,
}

impl IdentityResolver {
    pub fn new(store: Arc<dyn IdentityStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Resolve `email` to its identity, creating it with `password` and
    /// `metadata` if absent.
    pub async fn resolve(
        &self,
        email: &str,
        password: Option<&str>,
        metadata: &IdentityMetadata,
    ) -> Result<Resolution, AuthError> {
        if let Some(identity) = self.lookup(email).await? {
            return Ok(Resolution {
                identity,
                is_new: false,
            });
        }

        match bounded(self.timeout, self.store.create(email, password, metadata)).await {
            Ok(identity) => Ok(Resolution {
                identity,
                is_new: true,
            }),
            Err(StoreError::AlreadyExists) => {
                tracing::debug!("identity created concurrently, re-querying");
                match self.lookup(email).await? {
                    Some(identity) => Ok(Resolution {
                        identity,
                        is_new: false,
                    }),
                    None => Err(AuthError::IdentityStoreUnavailable(StoreError::Unavailable(
                        "identity reported as existing but not found".to_string(),
                    ))),
                }
            }
            Err(err) => Err(AuthError::IdentityStoreUnavailable(err)),
        }
    }

    async fn lookup(&self, email: &str) -> Result<Option<Identity>, AuthError> {
        bounded(self.timeout, self.store.lookup_by_email(email))
            .await
            .map_err(AuthError::IdentityStoreUnavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn resolver(store: Arc<dyn IdentityStore>) -> IdentityResolver {
        IdentityResolver::new(store, TIMEOUT)
    }

    /// Hides the winner from the first lookup and creates it just before our
    /// own create call, reproducing a lost race deterministically.
    struct LosingRace {
        inner: MemoryIdentityStore,
        lookups: AtomicUsize,
    }

    #[async_trait]
    impl IdentityStore for LosingRace {
        async fn lookup_by_email(&self, email: &str) -> Result<Option<Identity>, StoreError> {
            if self.lookups.fetch_add(1, Ordering::SeqCst) == 0 {
                return Ok(None);
            }
            self.inner.lookup_by_email(email).await
        }

        async fn create(
            &self,
            email: &str,
            password: Option<&str>,
            _metadata: &IdentityMetadata,
        ) -> Result<Identity, StoreError> {
            self.inner
                .create(email, password, &IdentityMetadata::local("Winner"))
                .await?;
            Err(StoreError::AlreadyExists)
        }

        async fn verify_password(
            &self,
            email: &str,
            password: &str,
        ) -> Result<Option<Identity>, StoreError> {
            self.inner.verify_password(email, password).await
        }
    }

    #[tokio::test]
    async fn creates_unknown_email_once() {
        let store = Arc::new(MemoryIdentityStore::new());
        let resolver = resolver(store.clone());

        let first = resolver
            .resolve("ada@example.com", None, &IdentityMetadata::local("Ada"))
            .await
            .unwrap();
        assert!(first.is_new);
        assert_eq!(first.identity.display_name, "Ada");

        let second = resolver
            .resolve("ada@example.com", None, &IdentityMetadata::local("Someone Else"))
            .await
            .unwrap();
        assert!(!second.is_new);
        assert_eq!(second.identity.id, first.identity.id);
        assert_eq!(second.identity.display_name, "Ada");
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn lost_creation_race_returns_the_winner() {
        let store = Arc::new(LosingRace {
            inner: MemoryIdentityStore::new(),
            lookups: AtomicUsize::new(0),
        });
        let resolution = resolver(store.clone())
            .resolve("ada@example.com", None, &IdentityMetadata::local("Loser"))
            .await
            .unwrap();

        assert!(!resolution.is_new);
        assert_eq!(resolution.identity.display_name, "Winner");
        assert_eq!(store.inner.len().await, 1);
    }

    #[tokio::test]
    async fn concurrent_resolves_agree_on_one_identity() {
        let store = Arc::new(MemoryIdentityStore::new());
        let tasks: Vec<_> = (0..8)
            .map(|i| {
                let resolver = resolver(store.clone());
                tokio::spawn(async move {
                    resolver
                        .resolve(
                            "race@example.com",
                            None,
                            &IdentityMetadata::local(format!("caller {i}")),
                        )
                        .await
                })
            })
            .collect();

        let mut ids = Vec::new();
        let mut created = 0;
        for task in tasks {
            let resolution = task.await.unwrap().unwrap();
            created += usize::from(resolution.is_new);
            ids.push(resolution.identity.id);
        }
        ids.dedup();
        assert_eq!(ids.len(), 1);
        assert_eq!(created, 1);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn unreachable_store_is_reported() {
        let store = Arc::new(MemoryIdentityStore::new());
        store.set_available(false);
        let err = resolver(store)
            .resolve("ada@example.com", None, &IdentityMetadata::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::IdentityStoreUnavailable(_)));
    }
}
