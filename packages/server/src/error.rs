use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use quiz_api::AuthError;
use serde::Serialize;

/// HTTP face of [`AuthError`].
#[derive(Debug)]
pub struct ApiError(pub AuthError);

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(error = %rejection, "rejected request body");
        ApiError(AuthError::Validation("Malformed request body".to_string()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            AuthError::Validation(_) | AuthError::EmailAlreadyInUse => StatusCode::BAD_REQUEST,
            AuthError::InvalidCredential
            | AuthError::InvalidSession
            | AuthError::InvalidAssertion(_) => StatusCode::UNAUTHORIZED,
            AuthError::NotFound => StatusCode::NOT_FOUND,
            AuthError::IdentityStoreUnavailable(_)
            | AuthError::ProfileStoreUnavailable(_)
            | AuthError::AssertionVerifierUnavailable(_)
            | AuthError::SigningConfiguration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = ErrorBody {
            message: self.0.public_message(),
        };
        (status, Json(body)).into_response()
    }
}
