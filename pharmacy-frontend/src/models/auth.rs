use serde::{Deserialize, Serialize};
use validator::Validate;

use super::route::Route;

#[derive(Serialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Please enter username and password"))]
    pub username: String,
    #[validate(length(min = 1, message = "Please enter username and password"))]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub access: String,
    pub refresh: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub is_admin: Option<bool>,
}

#[derive(Serialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Please enter a valid email"))]
    pub email: String,
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
    #[validate(must_match(
        other = "password",
        message = "Password and confirmation do not match"
    ))]
    pub confirm_password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct RegisterResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub user_id: Option<i64>,
}

#[derive(Serialize)]
pub struct RefreshRequest<'a> {
    pub refresh: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct RefreshResponse {
    pub access: String,
}

/// Error payload returned by the API: `{"error": ...}` from the auth views,
/// `{"detail": ...}` from the framework's own handlers.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

impl ErrorBody {
    pub fn into_message(self) -> Option<String> {
        self.error
            .or(self.detail)
            .filter(|message| !message.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOutcome {
    pub username: String,
    pub is_admin: bool,
    pub landing: Route,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterOutcome {
    pub message: String,
    pub user_id: Option<i64>,
    /// Registration never logs the user in.
    pub next: Route,
}
