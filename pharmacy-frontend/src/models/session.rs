use secrecy::{ExposeSecret, Secret, SecretString};
use std::collections::BTreeMap;

use super::route::Route;

pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
pub const USERNAME_KEY: &str = "username";
pub const IS_ADMIN_KEY: &str = "is_admin";

/// Username that is treated as an administrator even when the server flag
/// says otherwise. Compatibility behaviour only; the server remains the
/// authority on what an account may do.
const ADMIN_USERNAME: &str = "admin";

/// Authentication state shared by the request client and the route guard.
///
/// Tokens are kept as secrets so `Debug` output never contains them.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub access_token: Option<SecretString>,
    pub refresh_token: Option<SecretString>,
    pub username: Option<String>,
    pub is_admin: bool,
}

impl Session {
    /// Session produced by a successful login.
    pub fn from_login(access: String, refresh: String, username: String, server_admin: bool) -> Self {
        let is_admin = resolve_admin(server_admin, &username);
        Self {
            access_token: Some(Secret::new(access)),
            refresh_token: Some(Secret::new(refresh)),
            username: Some(username),
            is_admin,
        }
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_ref().map(|t| t.expose_secret().as_str())
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_ref().map(|t| t.expose_secret().as_str())
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    /// Admin rights never outlive the access token.
    pub fn is_admin(&self) -> bool {
        self.is_admin && self.is_authenticated()
    }

    pub fn is_empty(&self) -> bool {
        self.access_token.is_none()
            && self.refresh_token.is_none()
            && self.username.is_none()
            && !self.is_admin
    }

    /// Same session with a renewed access token; everything else untouched.
    pub fn with_access_token(mut self, access: String) -> Self {
        self.access_token = Some(Secret::new(access));
        self
    }

    /// Drops the access token together with the admin flag it backs.
    pub fn without_access_token(mut self) -> Self {
        self.access_token = None;
        self.is_admin = false;
        self
    }

    /// Flatten into the persisted key/value layout.
    pub fn to_entries(&self) -> BTreeMap<String, String> {
        let mut entries = BTreeMap::new();
        if let Some(token) = self.access_token() {
            entries.insert(ACCESS_TOKEN_KEY.to_string(), token.to_string());
        }
        if let Some(token) = self.refresh_token() {
            entries.insert(REFRESH_TOKEN_KEY.to_string(), token.to_string());
        }
        if let Some(username) = &self.username {
            entries.insert(USERNAME_KEY.to_string(), username.clone());
        }
        entries.insert(IS_ADMIN_KEY.to_string(), self.is_admin().to_string());
        entries
    }

    /// Rebuild from persisted entries. Empty values count as absent and a
    /// stored admin flag without an access token is discarded.
    pub fn from_entries(entries: &BTreeMap<String, String>) -> Self {
        let value = |key: &str| entries.get(key).filter(|v| !v.is_empty()).cloned();

        let access_token = value(ACCESS_TOKEN_KEY).map(Secret::new);
        let is_admin = access_token.is_some()
            && entries.get(IS_ADMIN_KEY).map(String::as_str) == Some("true");

        Self {
            access_token,
            refresh_token: value(REFRESH_TOKEN_KEY).map(Secret::new),
            username: value(USERNAME_KEY),
            is_admin,
        }
    }
}

/// Admin if the server says so or the username is literally "admin"
/// (case-insensitive).
pub fn resolve_admin(server_flag: bool, username: &str) -> bool {
    server_flag || username.to_lowercase() == ADMIN_USERNAME
}

/// Session transitions the hosting UI shell reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn { username: String, is_admin: bool },
    LoggedOut,
    /// Credentials could not be renewed and were cleared.
    Expired,
}

impl SessionEvent {
    /// Screen the shell should navigate to after this event.
    pub fn redirect(&self) -> Route {
        match self {
            SessionEvent::LoggedIn { is_admin, .. } => Route::landing(*is_admin),
            SessionEvent::LoggedOut | SessionEvent::Expired => Route::Login,
        }
    }
}
