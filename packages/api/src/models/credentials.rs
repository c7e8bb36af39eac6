//! Request and response bodies of the auth endpoints.
//!
//! Request fields are optional at the serde level so that a missing field is
//! reported by the flow as a validation error naming that field, rather than
//! as a generic deserialization failure.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignupRequest {
    #[serde(rename = "userName")]
    pub user_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GoogleRequest {
    pub credential: Option<String>,
}

/// Body returned by every successful auth flow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthResponse {
    pub message: String,
    #[serde(rename = "userName")]
    pub user_name: String,
    #[serde(rename = "userID")]
    pub user_id: String,
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}
