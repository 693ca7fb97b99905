use reqwest::Method;
use std::marker::PhantomData;
use std::sync::Arc;
use validator::Validate;

use crate::error::Result;
use crate::models::pharmacy::{ApprovalUpdate, LoginActivity, RecordId, Resource};
use crate::services::api_client::{ApiClient, RequestDescriptor};

pub const LOGIN_ACTIVITY_PATH: &str = "/login-activity/";

/// CRUD over one REST collection. All calls go through the authenticated
/// client, so they share its token refresh behaviour.
pub struct ResourceClient<T> {
    api: Arc<ApiClient>,
    _resource: PhantomData<fn() -> T>,
}

impl<T> Clone for ResourceClient<T> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            _resource: PhantomData,
        }
    }
}

impl<T: Resource> ResourceClient<T> {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            api,
            _resource: PhantomData,
        }
    }

    fn item_path(id: RecordId) -> String {
        format!("{}{}/", T::COLLECTION, id)
    }

    pub async fn list(&self) -> Result<Vec<T>> {
        self.api.get_json(T::COLLECTION).await
    }

    pub async fn get(&self, id: RecordId) -> Result<T> {
        self.api.get_json(&Self::item_path(id)).await
    }

    pub async fn create(&self, record: &T::New) -> Result<T> {
        record.validate()?;
        let request = RequestDescriptor::with_json(Method::POST, T::COLLECTION, record)?;
        self.api.send_json(request).await
    }

    /// Partial update; only the fields set on `changes` are sent.
    pub async fn update(&self, id: RecordId, changes: &T::Update) -> Result<T> {
        changes.validate()?;
        let request = RequestDescriptor::with_json(Method::PATCH, Self::item_path(id), changes)?;
        self.api.send_json(request).await
    }

    pub async fn set_approved(&self, id: RecordId, approved: bool) -> Result<T> {
        let request = RequestDescriptor::with_json(
            Method::PATCH,
            Self::item_path(id),
            &ApprovalUpdate { approved },
        )?;
        self.api.send_json(request).await
    }

    /// Flip the approval flag of a record the caller already holds.
    pub async fn toggle_approved(&self, record: &T) -> Result<T>
    where
        T: Approvable,
    {
        self.set_approved(record.id(), !record.approved()).await
    }

    pub async fn delete(&self, id: RecordId) -> Result<()> {
        self.api.delete(&Self::item_path(id)).await?;
        Ok(())
    }
}

/// Records an administrator can approve.
pub trait Approvable: Resource {
    fn approved(&self) -> bool;
}

impl Approvable for crate::models::pharmacy::Store {
    fn approved(&self) -> bool {
        self.approved
    }
}

impl Approvable for crate::models::pharmacy::Sale {
    fn approved(&self) -> bool {
        self.approved
    }
}

impl Approvable for crate::models::pharmacy::Payment {
    fn approved(&self) -> bool {
        self.approved
    }
}

/// Read-only audit log of logins.
#[derive(Clone)]
pub struct LoginActivityClient {
    api: Arc<ApiClient>,
}

impl LoginActivityClient {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    pub async fn list(&self) -> Result<Vec<LoginActivity>> {
        self.api.get_json(LOGIN_ACTIVITY_PATH).await
    }
}
