//! In-process profile store with an availability switch.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::ProfileStore;
use crate::error::StoreError;
use crate::models::Profile;

/// Profile store kept in memory, keyed by identity id.
#[derive(Debug)]
pub struct MemoryProfileStore {
    rows: Mutex<HashMap<String, Profile>>,
    available: AtomicBool,
}

impl Default for MemoryProfileStore {
    fn default() -> Self {
        Self {
            rows: Mutex::new(HashMap::new()),
            available: AtomicBool::new(true),
        }
    }
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.rows.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.lock().await.is_empty()
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("memory profile store switched off".to_string()))
        }
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn upsert_profile(&self, profile: &Profile) -> Result<(), StoreError> {
        self.check()?;
        let mut rows = self.rows.lock().await;
        let created_at = rows
            .get(&profile.id)
            .map(|existing| existing.created_at)
            .unwrap_or(profile.created_at);
        rows.insert(
            profile.id.clone(),
            Profile {
                created_at,
                ..profile.clone()
            },
        );
        Ok(())
    }

    async fn get_profile(&self, id: &str) -> Result<Option<Profile>, StoreError> {
        self.check()?;
        Ok(self.rows.lock().await.get(id).cloned())
    }
}
