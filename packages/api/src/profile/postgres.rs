//! Profile store backed by the `profiles` table.

use async_trait::async_trait;
use sqlx::PgPool;

use super::ProfileStore;
use crate::error::StoreError;
use crate::models::Profile;

/// Postgres profile store.
#[derive(Debug, Clone)]
pub struct PgProfileStore {
    pool: PgPool,
}

impl PgProfileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn upsert_profile(&self, profile: &Profile) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO profiles (id, email, username, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id)
            DO UPDATE SET
                email = EXCLUDED.email,
                username = EXCLUDED.username
            "#,
        )
        .bind(&profile.id)
        .bind(&profile.email)
        .bind(&profile.username)
        .bind(profile.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_profile(&self, id: &str) -> Result<Option<Profile>, StoreError> {
        Ok(
            sqlx::query_as("SELECT id, email, username, created_at FROM profiles WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }
}
