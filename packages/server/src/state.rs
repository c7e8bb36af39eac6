use std::sync::Arc;

use anyhow::Context;
use quiz_api::auth::{GoogleVerifier, SessionIssuer};
use quiz_api::db;
use quiz_api::identity::PgIdentityStore;
use quiz_api::profile::PgProfileStore;
use quiz_api::AuthService;

use crate::settings::Settings;

/// Application state shared across all handlers. Built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
}

impl AppState {
    /// Wire the Postgres-backed service from settings.
    ///
    /// The signing secret is checked before anything else so a misconfigured
    /// process never reaches the point of serving auth traffic.
    pub async fn new(settings: &Settings) -> anyhow::Result<Self> {
        let sessions = SessionIssuer::new(
            settings.session.secret.as_deref(),
            settings.session.lifetime()?,
        )?;
        let timeout = settings.upstream.timeout();

        let pool = db::connect(&settings.database.url(), settings.database.connections, timeout)
            .await
            .context("failed to connect to database")?;
        db::MIGRATOR
            .run(&pool)
            .await
            .context("failed to run migrations")?;

        let verifier = GoogleVerifier::new(&settings.google.certs, timeout)?;

        let auth = AuthService::new(
            Arc::new(PgIdentityStore::new(pool.clone())),
            Arc::new(PgProfileStore::new(pool)),
            Arc::new(verifier),
            sessions,
            &settings.google.audience,
            timeout,
        );
        Ok(Self::from_service(auth))
    }

    pub fn from_service(auth: AuthService) -> Self {
        Self {
            auth: Arc::new(auth),
        }
    }
}
