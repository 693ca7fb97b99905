use std::fmt;

/// Screens of the front end that navigation can land on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    Register,
    Dashboard,
    Admin,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Login => "/login",
            Route::Register => "/register",
            Route::Dashboard => "/dashboard",
            Route::Admin => "/admin",
        }
    }

    pub fn requires_auth(&self) -> bool {
        matches!(self, Route::Dashboard | Route::Admin)
    }

    pub fn requires_admin(&self) -> bool {
        matches!(self, Route::Admin)
    }

    /// Where a freshly logged-in user is sent.
    pub fn landing(is_admin: bool) -> Route {
        if is_admin {
            Route::Admin
        } else {
            Route::Dashboard
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}
