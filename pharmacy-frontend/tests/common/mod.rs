//! Common test utilities: a mock REST API and an app wired to it.
#![allow(dead_code)]

use pharmacy_frontend::config::ApiSettings;
use pharmacy_frontend::models::Session;
use pharmacy_frontend::services::credential_store::{CredentialStore, MemoryCredentialStore};
use pharmacy_frontend::AppState;
use std::sync::Arc;
use wiremock::MockServer;

/// Mount prefix mirroring the default deployment (`.../api`).
pub const API_PREFIX: &str = "/api";

pub struct TestApp {
    pub server: MockServer,
    pub state: AppState,
    pub credentials: Arc<MemoryCredentialStore>,
}

impl TestApp {
    pub async fn spawn(session: Session) -> Self {
        let server = MockServer::start().await;
        let credentials = Arc::new(MemoryCredentialStore::new(session));
        let settings = ApiSettings {
            base_url: format!("{}{}", server.uri(), API_PREFIX),
            timeout_secs: 5,
        };
        let state = AppState::new(&settings, credentials.clone() as Arc<dyn CredentialStore>)
            .expect("Failed to build app state");

        Self {
            server,
            state,
            credentials,
        }
    }

    pub fn session(&self) -> Session {
        self.credentials.get()
    }

    /// Paths of every request the mock API received, in order.
    pub async fn received_paths(&self) -> Vec<String> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .map(|request| request.url.path().to_string())
            .collect()
    }
}

pub fn api_path(path: &str) -> String {
    format!("{API_PREFIX}{path}")
}

pub fn logged_in(access: &str, refresh: &str) -> Session {
    Session::from_login(access.into(), refresh.into(), "jane".into(), false)
}

pub fn admin_session(access: &str) -> Session {
    Session::from_login(access.into(), "r".into(), "admin".into(), true)
}

/// Session holding an access token but no refresh token.
pub fn access_only(access: &str) -> Session {
    let mut session = logged_in(access, "unused");
    session.refresh_token = None;
    session
}
