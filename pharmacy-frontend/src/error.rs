use reqwest::StatusCode;
use thiserror::Error;

use crate::models::auth::ErrorBody;
use crate::models::Route;

pub type Result<T, E = ClientError> = std::result::Result<T, E>;

/// Every way a front-end operation can end without a usable response.
///
/// Unrecoverable authentication failures are not a separate variant: the
/// caller still receives the underlying `Http`/`Network` error while the
/// session layer broadcasts `SessionEvent::Expired`.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Rejected locally, nothing was sent.
    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    /// No response was received.
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    #[error("HTTP {status}: {}", .message.as_deref().unwrap_or("request failed"))]
    Http {
        status: StatusCode,
        message: Option<String>,
        body: String,
    },

    /// Refused locally by the route guard, nothing was sent. Carries the
    /// screen the user is sent to instead.
    #[error("Access denied, continue at {0}")]
    AccessDenied(Route),

    /// Login or registration refused; carries the text to show the user.
    #[error("{0}")]
    Rejected(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// Build an `Http` error from a non-2xx response, keeping the raw body and
    /// the server's `error`/`detail` message when it sent one.
    pub async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return ClientError::Network(e),
        };
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(ErrorBody::into_message);

        ClientError::Http {
            status,
            message,
            body,
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }

    /// Message the server attached to an error response, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ClientError::Http { message, .. } => message.as_deref(),
            _ => None,
        }
    }
}
