//! # Google ID token verification
//!
//! The browser obtains a Google ID token (a signed OpenID Connect JWT) through
//! Google Identity Services and posts it to `/auth/google`. [`GoogleVerifier`]
//! checks it without calling back into Google per request:
//!
//! 1. Decode the header, require `RS256` and a `kid`.
//! 2. Look the `kid` up in Google's published JWKS, cached for an hour. An
//!    unknown `kid` forces one refetch, which covers key rotation. Forced
//!    refetches happen at most once per minute, so made-up `kid`s cannot
//!    turn every request into a call to Google.
//! 3. Verify signature, `exp`, `aud` (our OAuth client id) and `iss`.
//! 4. Reject tokens whose `email_verified` is explicitly `false`.
//!
//! JWKS fetch failures are [`AssertionError::Unavailable`]; everything about
//! the token itself is [`AssertionError::Invalid`].

use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tokio::sync::RwLock;

use super::verifier::{AssertionVerifier, FederatedClaims};
use crate::error::AssertionError;

/// Google's published signing keys.
pub const GOOGLE_CERTS_URL: &str = "https://www.googleapis.com/oauth2/v3/certs";

const GOOGLE_ISSUERS: [&str; 2] = ["accounts.google.com", "https://accounts.google.com"];
const JWKS_TTL: Duration = Duration::from_secs(60 * 60);
const REFETCH_FLOOR: Duration = Duration::from_secs(60);

/// Claims of a Google ID token that we read.
#[derive(Debug, Deserialize)]
struct GoogleIdClaims {
    sub: String,
    email: Option<String>,
    email_verified: Option<bool>,
    name: Option<String>,
}

struct CachedKeys {
    keys: JwkSet,
    fetched_at: Instant,
}

/// Verifies Google ID tokens against Google's JWKS.
pub struct GoogleVerifier {
    http: reqwest::Client,
    certs_url: String,
    cache: RwLock<Option<CachedKeys>>,
    refetch_floor: Duration,
}

impl GoogleVerifier {
    /// Create a verifier fetching keys from `certs_url`, each fetch bounded by `timeout`.
    pub fn new(certs_url: impl Into<String>, timeout: Duration) -> Result<Self, AssertionError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AssertionError::Unavailable(e.to_string()))?;
        Ok(Self {
            http,
            certs_url: certs_url.into(),
            cache: RwLock::new(None),
            refetch_floor: REFETCH_FLOOR,
        })
    }

    /// Minimum age of the cached key set before an unknown `kid` may trigger
    /// a refetch. Defaults to one minute.
    pub fn with_refetch_floor(mut self, floor: Duration) -> Self {
        self.refetch_floor = floor;
        self
    }

    async fn fetch_keys(&self) -> Result<JwkSet, AssertionError> {
        let unavailable = |e: reqwest::Error| AssertionError::Unavailable(e.to_string());
        self.http
            .get(&self.certs_url)
            .send()
            .await
            .map_err(unavailable)?
            .error_for_status()
            .map_err(unavailable)?
            .json::<JwkSet>()
            .await
            .map_err(unavailable)
    }

    async fn key_for(&self, kid: &str) -> Result<DecodingKey, AssertionError> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref().filter(|c| c.fetched_at.elapsed() < JWKS_TTL) {
                if let Some(jwk) = cached.keys.find(kid) {
                    return DecodingKey::from_jwk(jwk)
                        .map_err(|e| AssertionError::Invalid(e.to_string()));
                }
                if cached.fetched_at.elapsed() < self.refetch_floor {
                    return Err(AssertionError::Invalid(format!("unknown signing key {kid}")));
                }
            }
        }

        let keys = self.fetch_keys().await?;
        let key = keys
            .find(kid)
            .map(DecodingKey::from_jwk)
            .transpose()
            .map_err(|e| AssertionError::Invalid(e.to_string()))?;
        *self.cache.write().await = Some(CachedKeys {
            keys,
            fetched_at: Instant::now(),
        });
        key.ok_or_else(|| AssertionError::Invalid(format!("unknown signing key {kid}")))
    }
}

#[async_trait]
impl AssertionVerifier for GoogleVerifier {
    async fn verify(
        &self,
        assertion: &str,
        audience: &str,
    ) -> Result<FederatedClaims, AssertionError> {
        let header = decode_header(assertion)
            .map_err(|e| AssertionError::Invalid(format!("malformed token header: {e}")))?;
        if header.alg != Algorithm::RS256 {
            return Err(AssertionError::Invalid(format!(
                "unexpected algorithm {:?}",
                header.alg
            )));
        }
        let kid = header
            .kid
            .ok_or_else(|| AssertionError::Invalid("token header has no kid".into()))?;

        let key = self.key_for(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[audience]);
        validation.set_issuer(&GOOGLE_ISSUERS);
        validation.leeway = 60;

        let claims = decode::<GoogleIdClaims>(assertion, &key, &validation)
            .map_err(|e| AssertionError::Invalid(e.to_string()))?
            .claims;

        if claims.email_verified == Some(false) {
            return Err(AssertionError::Invalid("email not verified".into()));
        }

        Ok(FederatedClaims {
            email: claims.email,
            display_name: claims.name,
            subject: claims.sub,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use axum::{extract::State, routing::get, Json, Router};
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::{json, Value};

    use super::*;

    const CLIENT_ID: &str = "client-id.apps.googleusercontent.com";
    const SIGNING_KEY: &str = include_str!("testdata/google_rs256.pem");
    const PUBLIC_JWK: &str = include_str!("testdata/google_rs256.jwk.json");

    /// JWKS endpoint whose published key ids can change between requests.
    struct Certs {
        kids: Mutex<Vec<&'static str>>,
        hits: AtomicUsize,
    }

    impl Certs {
        fn publish(&self, kids: &[&'static str]) {
            *self.kids.lock().unwrap() = kids.to_vec();
        }

        fn hits(&self) -> usize {
            self.hits.load(Ordering::SeqCst)
        }
    }

    async fn jwks(State(certs): State<Arc<Certs>>) -> Json<Value> {
        certs.hits.fetch_add(1, Ordering::SeqCst);
        let kids = certs.kids.lock().unwrap().clone();
        let keys: Vec<Value> = kids
            .into_iter()
            .map(|kid| {
                let mut jwk: Value = serde_json::from_str(PUBLIC_JWK).unwrap();
                jwk["kid"] = json!(kid);
                jwk
            })
            .collect();
        Json(json!({ "keys": keys }))
    }

    async fn serve_certs(kids: &[&'static str]) -> (Arc<Certs>, String) {
        let certs = Arc::new(Certs {
            kids: Mutex::new(kids.to_vec()),
            hits: AtomicUsize::new(0),
        });
        let app = Router::new()
            .route("/certs", get(jwks))
            .with_state(certs.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (certs, format!("http://{addr}/certs"))
    }

    fn claims() -> Value {
        let now = chrono::Utc::now().timestamp();
        json!({
            "iss": "https://accounts.google.com",
            "aud": CLIENT_ID,
            "sub": "google-sub-1",
            "email": "ada@example.com",
            "email_verified": true,
            "name": "Ada",
            "iat": now,
            "exp": now + 3600,
        })
    }

    fn sign(kid: &str, claims: &Value) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(kid.to_string());
        let key = EncodingKey::from_rsa_pem(SIGNING_KEY.as_bytes()).unwrap();
        encode(&header, claims, &key).unwrap()
    }

    fn verifier_for(url: &str) -> GoogleVerifier {
        GoogleVerifier::new(url, Duration::from_secs(5)).unwrap()
    }

    fn offline_verifier() -> GoogleVerifier {
        // Nothing listens here.
        GoogleVerifier::new("http://127.0.0.1:9/certs", Duration::from_millis(200)).unwrap()
    }

    #[tokio::test]
    async fn accepts_token_signed_by_published_key() {
        let (certs, url) = serve_certs(&["key-1"]).await;
        let verifier = verifier_for(&url);

        let federated = verifier.verify(&sign("key-1", &claims()), CLIENT_ID).await.unwrap();
        assert_eq!(federated.subject, "google-sub-1");
        assert_eq!(federated.email.as_deref(), Some("ada@example.com"));
        assert_eq!(federated.display_name.as_deref(), Some("Ada"));

        // Second token is checked against the cached key set.
        verifier.verify(&sign("key-1", &claims()), CLIENT_ID).await.unwrap();
        assert_eq!(certs.hits(), 1);
    }

    #[tokio::test]
    async fn rejects_wrong_audience_issuer_or_unverified_email() {
        let (_certs, url) = serve_certs(&["key-1"]).await;
        let verifier = verifier_for(&url);

        let token = sign("key-1", &claims());
        let err = verifier.verify(&token, "someone-else").await.unwrap_err();
        assert!(matches!(err, AssertionError::Invalid(_)));

        let mut foreign = claims();
        foreign["iss"] = json!("https://evil.example.com");
        let err = verifier.verify(&sign("key-1", &foreign), CLIENT_ID).await.unwrap_err();
        assert!(matches!(err, AssertionError::Invalid(_)));

        let mut unverified = claims();
        unverified["email_verified"] = json!(false);
        let err = verifier.verify(&sign("key-1", &unverified), CLIENT_ID).await.unwrap_err();
        assert!(matches!(err, AssertionError::Invalid(_)));

        let mut expired = claims();
        expired["exp"] = json!(chrono::Utc::now().timestamp() - 3600);
        let err = verifier.verify(&sign("key-1", &expired), CLIENT_ID).await.unwrap_err();
        assert!(matches!(err, AssertionError::Invalid(_)));
    }

    #[tokio::test]
    async fn unknown_kid_refetches_rotated_keys() {
        let (certs, url) = serve_certs(&["key-1"]).await;
        let verifier = verifier_for(&url).with_refetch_floor(Duration::ZERO);

        verifier.verify(&sign("key-1", &claims()), CLIENT_ID).await.unwrap();
        certs.publish(&["key-1", "key-2"]);

        verifier.verify(&sign("key-2", &claims()), CLIENT_ID).await.unwrap();
        assert_eq!(certs.hits(), 2);
    }

    #[tokio::test]
    async fn unknown_kid_refetch_is_rate_limited() {
        let (certs, url) = serve_certs(&["key-1"]).await;
        let verifier = verifier_for(&url);

        verifier.verify(&sign("key-1", &claims()), CLIENT_ID).await.unwrap();
        for _ in 0..3 {
            let err = verifier.verify(&sign("made-up", &claims()), CLIENT_ID).await.unwrap_err();
            assert!(matches!(err, AssertionError::Invalid(_)));
        }
        assert_eq!(certs.hits(), 1);
    }

    #[tokio::test]
    async fn unreachable_certs_endpoint_is_unavailable() {
        let err = offline_verifier()
            .verify(&sign("key-1", &claims()), CLIENT_ID)
            .await
            .unwrap_err();
        assert!(matches!(err, AssertionError::Unavailable(_)));
    }

    #[tokio::test]
    async fn garbage_is_invalid_without_fetching_keys() {
        let err = offline_verifier().verify("garbage", CLIENT_ID).await.unwrap_err();
        assert!(matches!(err, AssertionError::Invalid(_)));
    }

    #[tokio::test]
    async fn symmetric_tokens_are_rejected() {
        let token = encode(
            &Header::new(Algorithm::HS256),
            &json!({ "sub": "1", "email": "ada@example.com", "aud": CLIENT_ID }),
            &EncodingKey::from_secret(b"guessable"),
        )
        .unwrap();
        let err = offline_verifier().verify(&token, CLIENT_ID).await.unwrap_err();
        assert!(matches!(err, AssertionError::Invalid(_)));
    }
}
