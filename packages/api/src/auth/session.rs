//! # Session tokens
//!
//! Sessions are stateless: an HS256-signed JWT carrying the identity id as
//! `sub`, the display name, and `iat`/`exp`. Nothing is stored server-side,
//! so a token is valid exactly while its signature checks out and `now < exp`.
//!
//! [`SessionIssuer`] is built once at startup from the signing secret. A
//! missing or blank secret is reported as
//! [`AuthError::SigningConfiguration`] so the process can refuse to serve
//! instead of minting tokens nobody can verify.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// Default token lifetime.
pub const DEFAULT_SESSION_DAYS: i64 = 7;

/// Claims embedded in a session token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionClaims {
    /// Identity id.
    pub sub: String,
    /// Display name at issue time.
    pub name: String,
    /// Issued at (unix seconds).
    pub iat: i64,
    /// Expiry (unix seconds).
    pub exp: i64,
}

impl SessionClaims {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

/// Mints and checks session tokens.
#[derive(Clone)]
pub struct SessionIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime: Duration,
}

impl SessionIssuer {
    /// Build an issuer from the configured secret and token lifetime.
    pub fn new(secret: Option<&str>, lifetime: Duration) -> Result<Self, AuthError> {
        let secret = secret
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AuthError::SigningConfiguration("session secret is not set".into()))?;
        if lifetime <= Duration::zero() {
            return Err(AuthError::SigningConfiguration(
                "session lifetime must be positive".into(),
            ));
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            lifetime,
        })
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Issue a token for an identity, valid from now.
    pub fn issue(&self, identity_id: &str, display_name: &str) -> Result<String, AuthError> {
        self.issue_at(identity_id, display_name, Utc::now())
    }

    /// Issue a token as if the current time were `now`.
    pub fn issue_at(
        &self,
        identity_id: &str,
        display_name: &str,
        now: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        let claims = SessionClaims {
            sub: identity_id.to_string(),
            name: display_name.to_string(),
            iat: now.timestamp(),
            exp: (now + self.lifetime).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::SigningConfiguration(e.to_string()))
    }

    /// Check a token's signature and expiry against the current time.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, AuthError> {
        self.verify_at(token, Utc::now())
    }

    /// Check a token's signature and expiry as if the current time were `now`.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, AuthError> {
        // Expiry is compared below against `now` instead of the wall clock.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let claims = decode::<SessionClaims>(token, &self.decoding, &validation)
            .map_err(|_| AuthError::InvalidSession)?
            .claims;

        if now.timestamp() >= claims.exp {
            return Err(AuthError::InvalidSession);
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> SessionIssuer {
        SessionIssuer::new(Some("test-secret"), Duration::days(DEFAULT_SESSION_DAYS)).unwrap()
    }

    #[test]
    fn missing_secret_is_a_configuration_error() {
        let lifetime = Duration::days(1);
        assert!(matches!(
            SessionIssuer::new(None, lifetime),
            Err(AuthError::SigningConfiguration(_))
        ));
        assert!(matches!(
            SessionIssuer::new(Some("   "), lifetime),
            Err(AuthError::SigningConfiguration(_))
        ));
    }

    #[test]
    fn token_carries_subject_and_name() {
        let issuer = issuer();
        let token = issuer.issue("identity-1", "Ada").unwrap();
        let claims = issuer.verify(&token).unwrap();
        assert_eq!(claims.sub, "identity-1");
        assert_eq!(claims.name, "Ada");
        assert_eq!(claims.exp - claims.iat, Duration::days(DEFAULT_SESSION_DAYS).num_seconds());
    }

    #[test]
    fn expiry_boundary() {
        let issuer = issuer();
        let issued = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let token = issuer.issue_at("identity-1", "Ada", issued).unwrap();
        let expiry = issued + issuer.lifetime();

        assert!(issuer.verify_at(&token, expiry - Duration::seconds(1)).is_ok());
        assert!(matches!(
            issuer.verify_at(&token, expiry + Duration::seconds(1)),
            Err(AuthError::InvalidSession)
        ));
    }

    #[test]
    fn token_signed_with_another_secret_is_rejected() {
        let other = SessionIssuer::new(Some("other-secret"), Duration::days(1)).unwrap();
        let token = other.issue("identity-1", "Ada").unwrap();
        assert!(matches!(issuer().verify(&token), Err(AuthError::InvalidSession)));
        assert!(matches!(issuer().verify("not-a-jwt"), Err(AuthError::InvalidSession)));
    }
}
