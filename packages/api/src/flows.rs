//! # Auth flows
//!
//! [`AuthService`] sequences the three ways in: password signup, password
//! login and Google sign-in. Each runs through the same stages,
//!
//! `Received → Validated → IdentityResolved → ProfileSynced → TokenIssued → Responded`
//!
//! and any stage may end the flow with an [`AuthError`]. Stage transitions
//! are traced at `debug`; a failure is traced once, with the stage it
//! happened in, at `warn` for request errors and `error` for upstream ones.
//!
//! | Flow | Identity step | Profile step |
//! |------|---------------|--------------|
//! | signup | [`IdentityResolver`] must create; an existing email is `EmailAlreadyInUse` | best-effort upsert |
//! | login | store-side password verification only | best-effort upsert |
//! | google | verify assertion, then find-or-create by email | best-effort upsert |
//!
//! Email is the identity key across all flows: a Google sign-in with the email
//! of an earlier password signup lands on that same identity.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::{AssertionVerifier, SessionClaims, SessionIssuer};
use crate::error::{bounded, AssertionError, AuthError, StoreError};
use crate::identity::{IdentityResolver, IdentityStore};
use crate::models::{
    display_name_or_email, AuthResponse, GoogleRequest, Identity, IdentityMetadata, LoginRequest,
    ProfileView, SignupRequest,
};
use crate::profile::{ProfileStore, ProfileSynchronizer, SyncOutcome};

/// Progress of a single auth flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Received,
    Validated,
    IdentityResolved,
    ProfileSynced,
    TokenIssued,
    Responded,
}

#[derive(Debug, Clone, Copy)]
enum FlowKind {
    Signup,
    Login,
    Google,
}

impl fmt::Display for FlowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FlowKind::Signup => "signup",
            FlowKind::Login => "login",
            FlowKind::Google => "google",
        })
    }
}

struct Flow {
    kind: FlowKind,
    stage: Stage,
}

impl Flow {
    fn start(kind: FlowKind) -> Self {
        tracing::debug!(flow = %kind, stage = ?Stage::Received, "auth flow started");
        Self {
            kind,
            stage: Stage::Received,
        }
    }

    fn advance(&mut self, stage: Stage) {
        debug_assert!(stage > self.stage);
        self.stage = stage;
        tracing::debug!(flow = %self.kind, stage = ?stage, "auth flow advanced");
    }

    fn fail(&self, err: AuthError) -> AuthError {
        if err.is_upstream() {
            tracing::error!(flow = %self.kind, stage = ?self.stage, error = %err, "auth flow failed");
        } else {
            tracing::warn!(flow = %self.kind, stage = ?self.stage, error = %err, "auth flow rejected");
        }
        err
    }
}

/// Trimmed, non-blank value of a required field.
fn required(field: &str, value: Option<String>) -> Result<String, AuthError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AuthError::missing(field))
}

/// Required secret, passed through untouched.
fn required_secret(field: &str, value: Option<String>) -> Result<String, AuthError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AuthError::missing(field))
}

fn normalize_email(email: &str) -> Result<String, AuthError> {
    let email = email.trim().to_lowercase();
    if !email.contains('@') {
        return Err(AuthError::Validation("Invalid email address".to_string()));
    }
    Ok(email)
}

/// Orchestrates identity resolution, profile sync and session issuance.
pub struct AuthService {
    identities: Arc<dyn IdentityStore>,
    resolver: IdentityResolver,
    profiles: ProfileSynchronizer,
    sessions: SessionIssuer,
    verifier: Arc<dyn AssertionVerifier>,
    audience: String,
    timeout: Duration,
}

impl AuthService {
    /// `audience` is the OAuth client id Google assertions must be issued
    /// for; `timeout` bounds every upstream call.
    pub fn new(
        identities: Arc<dyn IdentityStore>,
        profiles: Arc<dyn ProfileStore>,
        verifier: Arc<dyn AssertionVerifier>,
        sessions: SessionIssuer,
        audience: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            resolver: IdentityResolver::new(identities.clone(), timeout),
            profiles: ProfileSynchronizer::new(profiles, timeout),
            identities,
            sessions,
            verifier,
            audience: audience.into(),
            timeout,
        }
    }

    /// Register a new email+password identity.
    pub async fn signup(&self, request: SignupRequest) -> Result<AuthResponse, AuthError> {
        let mut flow = Flow::start(FlowKind::Signup);

        let user_name = required("userName", request.user_name).map_err(|e| flow.fail(e))?;
        let email = required("email", request.email)
            .and_then(|e| normalize_email(&e))
            .map_err(|e| flow.fail(e))?;
        let password = required_secret("password", request.password).map_err(|e| flow.fail(e))?;
        flow.advance(Stage::Validated);

        let resolution = self
            .resolver
            .resolve(&email, Some(&password), &IdentityMetadata::local(user_name))
            .await
            .map_err(|e| flow.fail(e))?;
        if !resolution.is_new {
            // A retried signup still repairs a profile whose first write was deferred.
            self.profiles.sync(&resolution.identity).await;
            return Err(flow.fail(AuthError::EmailAlreadyInUse));
        }
        self.confirm_password(&resolution.identity, &password)
            .await
            .map_err(|e| flow.fail(e))?;
        flow.advance(Stage::IdentityResolved);

        self.finish(flow, resolution.identity, "Signup successful").await
    }

    /// Authenticate an email+password pair.
    ///
    /// Unknown email and wrong password are indistinguishable to the caller.
    /// The profile row is re-synced best-effort, like signup and google.
    pub async fn login(&self, request: LoginRequest) -> Result<AuthResponse, AuthError> {
        let mut flow = Flow::start(FlowKind::Login);

        let email = required("email", request.email)
            .and_then(|e| normalize_email(&e))
            .map_err(|e| flow.fail(e))?;
        let password = required_secret("password", request.password).map_err(|e| flow.fail(e))?;
        flow.advance(Stage::Validated);

        let verified =
            bounded(self.timeout, self.identities.verify_password(&email, &password)).await;
        let identity = match verified {
            Ok(Some(identity)) => identity,
            Ok(None) => return Err(flow.fail(AuthError::InvalidCredential)),
            Err(err) => return Err(flow.fail(AuthError::IdentityStoreUnavailable(err))),
        };
        flow.advance(Stage::IdentityResolved);

        self.finish(flow, identity, "Login successful").await
    }

    /// Sign in with a Google ID token, creating the identity on first use.
    pub async fn google(&self, request: GoogleRequest) -> Result<AuthResponse, AuthError> {
        let mut flow = Flow::start(FlowKind::Google);

        let credential =
            required_secret("credential", request.credential).map_err(|e| flow.fail(e))?;
        let verified =
            bounded(self.timeout, self.verifier.verify(&credential, &self.audience)).await;
        let claims = match verified {
            Ok(claims) => claims,
            Err(AssertionError::Invalid(reason)) => {
                return Err(flow.fail(AuthError::InvalidAssertion(reason)))
            }
            Err(AssertionError::Unavailable(reason)) => {
                return Err(flow.fail(AuthError::AssertionVerifierUnavailable(reason)))
            }
        };
        let email = claims
            .email
            .as_deref()
            .map(normalize_email)
            .and_then(Result::ok)
            .ok_or_else(|| {
                flow.fail(AuthError::InvalidAssertion("assertion carries no email".into()))
            })?;
        flow.advance(Stage::Validated);

        let display_name = display_name_or_email(claims.display_name.as_deref(), &email);
        let resolution = self
            .resolver
            .resolve(
                &email,
                None,
                &IdentityMetadata::federated(display_name, claims.subject),
            )
            .await
            .map_err(|e| flow.fail(e))?;
        flow.advance(Stage::IdentityResolved);

        self.finish(flow, resolution.identity, "Login successful").await
    }

    /// Decode a session token presented by a client.
    pub fn introspect(&self, token: &str) -> Result<SessionClaims, AuthError> {
        self.sessions.verify(token)
    }

    /// Public profile of an identity.
    pub async fn profile(&self, identity_id: &str) -> Result<ProfileView, AuthError> {
        Ok(self.profiles.fetch(identity_id).await?.to_view())
    }

    /// The store must accept the password it was just given.
    async fn confirm_password(&self, identity: &Identity, password: &str) -> Result<(), AuthError> {
        let verified = bounded(
            self.timeout,
            self.identities.verify_password(&identity.email, password),
        )
        .await;
        match verified {
            Ok(Some(stored)) if stored.id == identity.id => Ok(()),
            Ok(_) => Err(AuthError::IdentityStoreUnavailable(StoreError::Unavailable(
                "new identity does not accept its password".to_string(),
            ))),
            Err(err) => Err(AuthError::IdentityStoreUnavailable(err)),
        }
    }

    /// Shared tail of every flow: sync profile, issue token, respond.
    async fn finish(
        &self,
        mut flow: Flow,
        identity: Identity,
        message: &str,
    ) -> Result<AuthResponse, AuthError> {
        let outcome = self.profiles.sync(&identity).await;
        if outcome == SyncOutcome::Synced {
            flow.advance(Stage::ProfileSynced);
        }

        let token = self
            .sessions
            .issue(&identity.id, &identity.display_name)
            .map_err(|e| flow.fail(e))?;
        flow.advance(Stage::TokenIssued);

        flow.advance(Stage::Responded);
        Ok(AuthResponse {
            message: message.to_string(),
            user_name: identity.display_name,
            user_id: identity.id,
            token,
            warning: outcome.warning(),
        })
    }
}
