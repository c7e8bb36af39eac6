use std::time::Duration;

use chrono::TimeDelta;
use config::{Config, ConfigError, Environment, File, FileFormat};
use quiz_api::AuthError;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Database {
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: String,
    pub database: String,
    pub connections: u32,
}

impl Database {
    pub fn url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.database
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct Session {
    /// HS256 signing secret. No default: startup fails without it.
    pub secret: Option<String>,
    /// Token lifetime in days.
    pub days: i64,
}

impl Session {
    pub fn lifetime(&self) -> Result<TimeDelta, AuthError> {
        TimeDelta::try_days(self.days).ok_or_else(|| {
            AuthError::SigningConfiguration(format!(
                "session lifetime of {} days is out of range",
                self.days
            ))
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct Google {
    /// OAuth client id expected in the `aud` claim.
    pub audience: String,
    /// JWKS endpoint.
    pub certs: String,
}

#[derive(Debug, Deserialize)]
pub struct Upstream {
    /// Milliseconds.
    pub timeout: u64,
}

impl Upstream {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout)
    }
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub host: String,
    pub port: u16,
}

impl Server {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub database: Database,
    pub session: Session,
    pub google: Google,
    pub upstream: Upstream,
    pub server: Server,
}

impl Settings {
    /// Defaults, then `config.toml` if present, then `QUIZ_*` environment
    /// variables (`QUIZ_SESSION_SECRET` sets `session.secret`).
    pub fn new() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("database.user", "quiz")?
            .set_default("database.password", "password")?
            .set_default("database.host", "localhost")?
            .set_default("database.port", "5432")?
            .set_default("database.database", "quiz")?
            .set_default("database.connections", 5)?
            .set_default("session.days", quiz_api::auth::DEFAULT_SESSION_DAYS)?
            .set_default("google.audience", "google client_id")?
            .set_default("google.certs", quiz_api::auth::GOOGLE_CERTS_URL)?
            .set_default("upstream.timeout", 5000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .add_source(
                File::with_name("config.toml")
                    .format(FileFormat::Toml)
                    .required(false),
            )
            .add_source(
                Environment::with_prefix("QUIZ")
                    .prefix_separator("_")
                    .separator("_")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
