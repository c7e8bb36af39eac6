//! In-process identity store.
//!
//! Behaves like the Postgres store (unique emails, Argon2 hashes, opaque UUID
//! ids) and can be switched unavailable to exercise outage handling.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::IdentityStore;
use crate::auth::{hash_password, verify_password as password_matches};
use crate::error::StoreError;
use crate::models::{display_name_or_email, Identity, IdentityMetadata};

#[derive(Debug, Clone)]
struct StoredIdentity {
    identity: Identity,
    password_hash: Option<String>,
    federated_provider_id: Option<String>,
}

/// Identity store kept in memory, keyed by email.
#[derive(Debug)]
pub struct MemoryIdentityStore {
    records: Mutex<HashMap<String, StoredIdentity>>,
    available: AtomicBool,
}

impl Default for MemoryIdentityStore {
    fn default() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            available: AtomicBool::new(true),
        }
    }
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with [`StoreError::Unavailable`] (or succeed again).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of identities held.
    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }

    /// Federated subject id recorded when `email` was created, if any.
    pub async fn federated_provider_id(&self, email: &str) -> Option<String> {
        self.records
            .lock()
            .await
            .get(email)
            .and_then(|r| r.federated_provider_id.clone())
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("memory identity store switched off".to_string()))
        }
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn lookup_by_email(&self, email: &str) -> Result<Option<Identity>, StoreError> {
        self.check()?;
        Ok(self
            .records
            .lock()
            .await
            .get(email)
            .map(|r| r.identity.clone()))
    }

    async fn create(
        &self,
        email: &str,
        password: Option<&str>,
        metadata: &IdentityMetadata,
    ) -> Result<Identity, StoreError> {
        self.check()?;
        let password_hash = password.map(hash_password).transpose()?;

        let mut records = self.records.lock().await;
        if records.contains_key(email) {
            return Err(StoreError::AlreadyExists);
        }
        let identity = Identity {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            display_name: display_name_or_email(metadata.display_name.as_deref(), email),
        };
        records.insert(
            email.to_string(),
            StoredIdentity {
                identity: identity.clone(),
                password_hash,
                federated_provider_id: metadata.federated_provider_id.clone(),
            },
        );
        Ok(identity)
    }

    async fn verify_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<Identity>, StoreError> {
        self.check()?;
        let record = self.records.lock().await.get(email).cloned();
        let Some(StoredIdentity {
            identity,
            password_hash: Some(hash),
            ..
        }) = record
        else {
            return Ok(None);
        };
        Ok(password_matches(password, &hash)?.then_some(identity))
    }
}
