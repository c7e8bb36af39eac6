//! HTTP surface.
//!
//! | Method/Path | Success |
//! |---|---|
//! | `POST /auth/signup` | 201 `{message,userName,userID,token}` |
//! | `POST /auth/login` | 200 `{message,userName,userID,token}` |
//! | `POST /auth/google` | 200 `{message,userName,userID,token}` |
//! | `GET /auth/me` | 200 `{userID,userName,expiresAt}` for a bearer token |
//! | `GET /profile/{user_id}` | 200 `{username,email,joined}` |
//! | `GET /health` | 200 `ok` |

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use quiz_api::{AuthError, AuthResponse, GoogleRequest, LoginRequest, ProfileView, SignupRequest};
use serde::Serialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct MeResponse {
    #[serde(rename = "userID")]
    pub user_id: String,
    #[serde(rename = "userName")]
    pub user_name: String,
    #[serde(rename = "expiresAt")]
    pub expires_at: Option<DateTime<Utc>>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/google", post(google))
        .route("/auth/me", get(me))
        .route("/profile/{user_id}", get(profile))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

/// POST /auth/signup
async fn signup(
    State(state): State<AppState>,
    body: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let Json(request) = body?;
    let response = state.auth.signup(request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /auth/login
async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, ApiError> {
    let Json(request) = body?;
    Ok(Json(state.auth.login(request).await?))
}

/// POST /auth/google
async fn google(
    State(state): State<AppState>,
    body: Result<Json<GoogleRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, ApiError> {
    let Json(request) = body?;
    Ok(Json(state.auth.google(request).await?))
}

/// GET /auth/me
async fn me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<MeResponse>, ApiError> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(AuthError::InvalidSession)?;
    let claims = state.auth.introspect(token.trim())?;
    Ok(Json(MeResponse {
        expires_at: claims.expires_at(),
        user_id: claims.sub,
        user_name: claims.name,
    }))
}

/// GET /profile/{user_id}
async fn profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<ProfileView>, ApiError> {
    Ok(Json(state.auth.profile(&user_id).await?))
}
