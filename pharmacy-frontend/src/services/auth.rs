use std::sync::Arc;
use tracing::{info, warn};
use validator::Validate;

use crate::error::{ClientError, Result};
use crate::models::auth::{
    LoginOutcome, LoginRequest, LoginResponse, RegisterOutcome, RegisterRequest, RegisterResponse,
};
use crate::models::{Route, Session, SessionEvent};
use crate::services::api_client::{ApiClient, RequestDescriptor};

pub const LOGIN_PATH: &str = "/login/";
pub const REGISTER_PATH: &str = "/register/";

const LOGIN_FAILED: &str = "Invalid credentials";
const REGISTER_FAILED: &str = "Registration failed";
const REGISTERED: &str = "Registered successfully";

/// Login, registration and logout: the only writers of a whole session.
#[derive(Clone)]
pub struct AuthService {
    api: Arc<ApiClient>,
}

impl AuthService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    pub fn current_session(&self) -> Session {
        self.api.credentials().get()
    }

    /// Exchange credentials for a token pair and store the new session.
    ///
    /// Empty fields fail validation before anything is sent. A refused login
    /// leaves the current session untouched.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome> {
        let form = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        form.validate()?;

        let request = RequestDescriptor::with_json(reqwest::Method::POST, LOGIN_PATH, &form)?;
        let response = self
            .api
            .send_public(request)
            .await
            .map_err(|e| rejected(e, LOGIN_FAILED))?;

        let tokens: LoginResponse = response
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse(format!("{LOGIN_PATH}: {e}")))?;

        let username = tokens
            .username
            .filter(|name| !name.is_empty())
            .unwrap_or(form.username);
        let session = Session::from_login(
            tokens.access,
            tokens.refresh,
            username.clone(),
            tokens.is_admin.unwrap_or(false),
        );
        let is_admin = session.is_admin();

        self.api.credentials().set(session);

        info!(username = %username, is_admin, "User logged in successfully");
        self.api.notify(SessionEvent::LoggedIn {
            username: username.clone(),
            is_admin,
        });

        Ok(LoginOutcome {
            username,
            is_admin,
            landing: Route::landing(is_admin),
        })
    }

    /// Create an account. Does not log the user in.
    pub async fn register(&self, form: RegisterRequest) -> Result<RegisterOutcome> {
        form.validate()?;

        let request = RequestDescriptor::with_json(reqwest::Method::POST, REGISTER_PATH, &form)?;
        let response = self
            .api
            .send_public(request)
            .await
            .map_err(|e| rejected(e, REGISTER_FAILED))?;

        // The account exists at this point; an odd body is not worth failing for.
        let body = response
            .json::<RegisterResponse>()
            .await
            .unwrap_or_default();

        info!(username = %form.username, user_id = ?body.user_id, "User registered");

        Ok(RegisterOutcome {
            message: body.message.unwrap_or_else(|| REGISTERED.to_string()),
            user_id: body.user_id,
            next: Route::Login,
        })
    }

    /// Forget the session locally. Always succeeds, nothing is sent.
    pub fn logout(&self) -> Route {
        self.api.credentials().clear();
        info!("User logged out");
        self.api.notify(SessionEvent::LoggedOut);
        Route::Login
    }
}

/// Turn a refused credential exchange into the text shown to the user:
/// the server's message when it sent one, `fallback` otherwise.
fn rejected(err: ClientError, fallback: &str) -> ClientError {
    match err {
        ClientError::Http {
            status, message, ..
        } => {
            warn!(%status, "Credential exchange refused");
            ClientError::Rejected(message.unwrap_or_else(|| fallback.to_string()))
        }
        other => other,
    }
}
