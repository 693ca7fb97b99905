pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod services;

pub use error::{ClientError, Result};

use crate::config::ApiSettings;
use crate::middleware::{GuardDecision, Navigation, RouteGuard};
use crate::models::pharmacy::{AdminSummary, Payment, Sale, Store};
use crate::models::SessionEvent;
use crate::services::{
    api_client::ApiClient,
    auth::AuthService,
    credential_store::CredentialStore,
    resources::{LoginActivityClient, ResourceClient},
};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Shared front-end state: one API client and the services built on it.
#[derive(Clone)]
pub struct AppState {
    pub api: Arc<ApiClient>,
    pub auth: AuthService,
}

impl AppState {
    pub fn new(settings: &ApiSettings, credentials: Arc<dyn CredentialStore>) -> Result<Self> {
        let api = Arc::new(ApiClient::new(settings, credentials)?);
        Ok(Self {
            auth: AuthService::new(Arc::clone(&api)),
            api,
        })
    }

    pub fn stores(&self) -> ResourceClient<Store> {
        ResourceClient::new(Arc::clone(&self.api))
    }

    pub fn sales(&self) -> ResourceClient<Sale> {
        ResourceClient::new(Arc::clone(&self.api))
    }

    pub fn payments(&self) -> ResourceClient<Payment> {
        ResourceClient::new(Arc::clone(&self.api))
    }

    pub fn login_activity(&self) -> LoginActivityClient {
        LoginActivityClient::new(Arc::clone(&self.api))
    }

    /// Apply the route guard to `path` using the current session.
    pub fn navigate(&self, path: &str) -> Navigation {
        RouteGuard::navigate(path, &self.api.credentials().get())
    }

    /// Route guard for admin-only operations (approve, edit, delete, audit
    /// log, overview). Fails with the redirect target instead of sending.
    pub fn require_admin(&self) -> Result<()> {
        match RouteGuard::check(true, &self.api.credentials().get()) {
            GuardDecision::Admit => Ok(()),
            GuardDecision::Redirect(route) => {
                tracing::warn!(redirect = %route, "Admin operation refused");
                Err(ClientError::AccessDenied(route))
            }
        }
    }

    /// Totals and recent logins for the admin overview.
    pub async fn admin_summary(&self) -> Result<AdminSummary> {
        self.require_admin()?;

        let stores = self.stores();
        let sales = self.sales();
        let payments = self.payments();
        let activity = self.login_activity();
        let (stores, sales, payments, logins) = tokio::try_join!(
            stores.list(),
            sales.list(),
            payments.list(),
            activity.list()
        )?;

        Ok(AdminSummary::from_records(&stores, &sales, &payments, logins))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.api.subscribe()
    }
}
