use tracing::debug;

use crate::models::{Route, Session};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Admit,
    Redirect(Route),
}

/// Result of resolving a requested path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Render(Route),
    Redirect(Route),
    NotFound,
}

/// Navigation-time authorization.
///
/// Only looks at the stored session. Token validity is not checked here;
/// an expired token surfaces on the next API call instead.
pub struct RouteGuard;

impl RouteGuard {
    pub fn check(requires_admin: bool, session: &Session) -> GuardDecision {
        if !session.is_authenticated() {
            return GuardDecision::Redirect(Route::Login);
        }

        if requires_admin && !session.is_admin() {
            return GuardDecision::Redirect(Route::Dashboard);
        }

        GuardDecision::Admit
    }

    /// Resolve `path` against the route table and apply the guard.
    pub fn navigate(path: &str, session: &Session) -> Navigation {
        let path = normalize(path);

        let route = match path {
            "/" => return Navigation::Redirect(Route::Login),
            "/login" => Route::Login,
            "/register" => Route::Register,
            "/admin" => Route::Admin,
            p if p == "/dashboard" || p.starts_with("/dashboard/") => Route::Dashboard,
            _ => return Navigation::NotFound,
        };

        if !route.requires_auth() {
            return Navigation::Render(route);
        }

        match Self::check(route.requires_admin(), session) {
            GuardDecision::Admit => Navigation::Render(route),
            GuardDecision::Redirect(target) => {
                debug!(path, redirect = %target, "Navigation redirected");
                Navigation::Redirect(target)
            }
        }
    }
}

/// Strip query, fragment and trailing slashes; keeps "/" for the root.
fn normalize(path: &str) -> &str {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    }
}
