//! Identity store backed by the `identities` table.

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::IdentityStore;
use crate::auth::{hash_password, verify_password as password_matches};
use crate::error::StoreError;
use crate::models::{display_name_or_email, Identity, IdentityMetadata};

#[derive(Debug, FromRow)]
struct IdentityRow {
    id: String,
    email: String,
    display_name: Option<String>,
    password_hash: Option<String>,
}

impl IdentityRow {
    fn to_identity(&self) -> Identity {
        Identity {
            id: self.id.clone(),
            email: self.email.clone(),
            display_name: display_name_or_email(self.display_name.as_deref(), &self.email),
        }
    }
}

/// Argon2 is CPU-bound; keep it off the async workers.
async fn blocking<T, F>(work: F) -> Result<T, StoreError>
where
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| StoreError::Unavailable(e.to_string()))?
}

/// Postgres identity store.
#[derive(Debug, Clone)]
pub struct PgIdentityStore {
    pool: PgPool,
}

impl PgIdentityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn row_by_email(&self, email: &str) -> Result<Option<IdentityRow>, StoreError> {
        Ok(sqlx::query_as(
            "SELECT id, email, display_name, password_hash FROM identities WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?)
    }
}

#[async_trait]
impl IdentityStore for PgIdentityStore {
    async fn lookup_by_email(&self, email: &str) -> Result<Option<Identity>, StoreError> {
        Ok(self.row_by_email(email).await?.map(|row| row.to_identity()))
    }

    async fn create(
        &self,
        email: &str,
        password: Option<&str>,
        metadata: &IdentityMetadata,
    ) -> Result<Identity, StoreError> {
        let password_hash = match password {
            Some(password) => {
                let password = password.to_string();
                Some(blocking(move || hash_password(&password)).await?)
            }
            None => None,
        };

        // A concurrent insert of the same email surfaces as 23505, mapped to AlreadyExists.
        let row: IdentityRow = sqlx::query_as(
            r#"
            INSERT INTO identities (id, email, password_hash, display_name, federated_provider_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, email, display_name, password_hash
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(email)
        .bind(&password_hash)
        .bind(&metadata.display_name)
        .bind(&metadata.federated_provider_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.to_identity())
    }

    async fn verify_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<Identity>, StoreError> {
        let Some(row) = self.row_by_email(email).await? else {
            return Ok(None);
        };
        let Some(hash) = row.password_hash.clone() else {
            return Ok(None);
        };

        let password = password.to_string();
        let valid = blocking(move || password_matches(&password, &hash)).await?;
        Ok(valid.then(|| row.to_identity()))
    }
}
