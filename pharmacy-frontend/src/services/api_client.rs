//! Authenticated access to the pharmacy REST API.
//!
//! Every request carries the stored access token. A 401 on a fresh request
//! triggers one token refresh followed by one replay of the request:
//!
//! ```text
//! Fresh ──401──▶ refresh ──ok──▶ Retried ──▶ outcome returned as-is
//!                   │
//!                   └──fail──▶ session cleared, SessionEvent::Expired
//! ```
//!
//! Replays are tagged [`Attempt::Retried`] and never refresh again, and the
//! refresh call bypasses this path entirely, so the protocol always ends.

use reqwest::{Client, Method, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use service_core::observability::TracedClientExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error, info, warn};

use crate::config::ApiSettings;
use crate::error::{ClientError, Result};
use crate::models::auth::{RefreshRequest, RefreshResponse};
use crate::models::SessionEvent;
use crate::services::credential_store::CredentialStore;

/// Token refresh endpoint, relative to the API base.
pub const REFRESH_PATH: &str = "/token/refresh/";

const EVENT_CAPACITY: usize = 16;

/// What to send; never mutated between the first attempt and the replay.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

impl RequestDescriptor {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::POST, path).with_body(body)
    }

    pub fn patch(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::PATCH, path).with_body(body)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Build a request with a typed JSON body.
    pub fn with_json<T: Serialize + ?Sized>(method: Method, path: impl Into<String>, body: &T) -> Result<Self> {
        let body = serde_json::to_value(body)
            .map_err(|e| ClientError::InvalidRequest(format!("failed to encode body: {e}")))?;
        Ok(Self::new(method, path).with_body(body))
    }

    pub fn is_refresh(&self) -> bool {
        self.path.contains(REFRESH_PATH)
    }
}

/// Whether a dispatch is the original one or the single replay after refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    Fresh,
    Retried,
}

/// A failed dispatch may enter the refresh protocol only when it is a 401
/// on a first attempt that was not itself the refresh call.
pub fn refresh_eligible(request: &RequestDescriptor, attempt: Attempt, err: &ClientError) -> bool {
    err.is_unauthorized() && attempt == Attempt::Fresh && !request.is_refresh()
}

pub struct ApiClient {
    client: Client,
    base_url: String,
    credentials: Arc<dyn CredentialStore>,
    events: broadcast::Sender<SessionEvent>,
    /// Serialises refreshes so concurrent 401s share one token renewal.
    refresh_lock: Mutex<()>,
}

impl ApiClient {
    pub fn new(settings: &ApiSettings, credentials: Arc<dyn CredentialStore>) -> Result<Self> {
        Url::parse(&settings.base_url).map_err(|e| {
            ClientError::Config(format!("invalid API base URL '{}': {}", settings.base_url, e))
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {e}")))?;

        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            credentials,
            events,
            refresh_lock: Mutex::new(()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn credentials(&self) -> &Arc<dyn CredentialStore> {
        &self.credentials
    }

    /// Receive session transitions (login, logout, expiry).
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub(crate) fn notify(&self, event: SessionEvent) {
        debug!(?event, "Session event");
        if self.events.send(event).is_err() {
            debug!("No session listeners attached");
        }
    }

    fn endpoint(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    pub async fn get(&self, path: &str) -> Result<Response> {
        self.send(RequestDescriptor::get(path)).await
    }

    pub async fn post(&self, path: &str, body: Value) -> Result<Response> {
        self.send(RequestDescriptor::post(path, body)).await
    }

    pub async fn patch(&self, path: &str, body: Value) -> Result<Response> {
        self.send(RequestDescriptor::patch(path, body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<Response> {
        self.send(RequestDescriptor::delete(path)).await
    }

    /// Send and decode a JSON response body.
    pub async fn send_json<T: DeserializeOwned>(&self, request: RequestDescriptor) -> Result<T> {
        let path = request.path.clone();
        let response = self.send(request).await?;
        decode(response, &path).await
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send_json(RequestDescriptor::get(path)).await
    }

    /// Send with the stored bearer token and the refresh protocol.
    pub async fn send(&self, request: RequestDescriptor) -> Result<Response> {
        let sent_token = self.credentials.get().access_token().map(str::to_owned);

        match self
            .dispatch(&request, sent_token.as_deref(), Attempt::Fresh)
            .await
        {
            Err(err) if refresh_eligible(&request, Attempt::Fresh, &err) => {
                warn!(
                    method = %request.method,
                    path = %request.path,
                    "Request unauthorized, attempting token refresh"
                );
                self.recover(&request, sent_token.as_deref(), err).await
            }
            outcome => outcome,
        }
    }

    /// Send without a bearer token and without the refresh protocol.
    ///
    /// Used for credential exchanges (login, registration) where a 401 means
    /// the submitted credentials are wrong, not that a session expired.
    pub async fn send_public(&self, request: RequestDescriptor) -> Result<Response> {
        self.dispatch(&request, None, Attempt::Fresh).await
    }

    async fn dispatch(
        &self,
        request: &RequestDescriptor,
        bearer: Option<&str>,
        attempt: Attempt,
    ) -> Result<Response> {
        let url = self.endpoint(&request.path);

        let mut builder = self
            .client
            .traced(request.method.clone(), &url)
            .maybe_bearer_auth(bearer);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        debug!(
            method = %request.method,
            path = %request.path,
            ?attempt,
            authenticated = bearer.is_some(),
            "Dispatching API request"
        );

        let response = builder.send().await.map_err(|e| {
            error!("Failed to send {} request to {}: {}", request.method, url, e);
            ClientError::Network(e)
        })?;

        if response.status().is_success() {
            return Ok(response);
        }

        let err = ClientError::from_response(response).await;
        debug!(
            method = %request.method,
            path = %request.path,
            ?attempt,
            status = ?err.status(),
            "API request failed"
        );
        Err(err)
    }

    /// Refresh protocol for a fresh request that got a 401.
    async fn recover(
        &self,
        request: &RequestDescriptor,
        sent_token: Option<&str>,
        original: ClientError,
    ) -> Result<Response> {
        let guard = self.refresh_lock.lock().await;
        let session = self.credentials.get();

        // Another request renewed the token while this one was in flight.
        if let Some(current) = session.access_token().filter(|t| Some(*t) != sent_token) {
            let current = current.to_owned();
            drop(guard);
            debug!(path = %request.path, "Access token already renewed, replaying request");
            return self
                .dispatch(request, Some(&current), Attempt::Retried)
                .await;
        }

        let Some(refresh_token) = session.refresh_token().map(str::to_owned) else {
            warn!(path = %request.path, "No refresh token available, session expired");
            self.credentials.set(session.without_access_token());
            drop(guard);
            self.notify(SessionEvent::Expired);
            return Err(original);
        };

        match self.refresh_access_token(&refresh_token).await {
            Ok(access) => {
                // Only write back if nobody logged in or out meanwhile.
                let latest = self.credentials.get();
                if latest.refresh_token() == Some(refresh_token.as_str()) {
                    self.credentials.set(latest.with_access_token(access.clone()));
                }
                drop(guard);

                info!(path = %request.path, "Access token refreshed, replaying request");
                self.dispatch(request, Some(&access), Attempt::Retried)
                    .await
            }
            Err(refresh_error) => {
                error!(
                    path = %request.path,
                    error = %refresh_error,
                    "Token refresh failed, clearing session"
                );
                self.credentials.clear();
                drop(guard);
                self.notify(SessionEvent::Expired);
                Err(refresh_error)
            }
        }
    }

    /// Exchange the refresh token for a new access token.
    ///
    /// Goes straight to the transport: the refresh call itself is never
    /// subject to the refresh protocol.
    async fn refresh_access_token(&self, refresh_token: &str) -> Result<String> {
        let url = self.endpoint(REFRESH_PATH);

        let response = self
            .client
            .traced_post(&url)
            .json(&RefreshRequest {
                refresh: refresh_token,
            })
            .send()
            .await
            .map_err(|e| {
                error!("Failed to send token refresh request to {}: {}", url, e);
                ClientError::Network(e)
            })?;

        if !response.status().is_success() {
            return Err(ClientError::from_response(response).await);
        }

        let body: RefreshResponse = decode(response, REFRESH_PATH).await?;
        if body.access.is_empty() {
            return Err(ClientError::InvalidResponse(
                "token refresh returned an empty access token".to_string(),
            ));
        }

        Ok(body.access)
    }
}

async fn decode<T: DeserializeOwned>(response: Response, path: &str) -> Result<T> {
    let status = response.status();
    let bytes = response.bytes().await.map_err(ClientError::Network)?;

    // 204 responses (deletes) decode as JSON null.
    let bytes: &[u8] = if status == StatusCode::NO_CONTENT && bytes.is_empty() {
        b"null"
    } else {
        &bytes
    };

    serde_json::from_slice(bytes)
        .map_err(|e| ClientError::InvalidResponse(format!("{path}: {e}")))
}
