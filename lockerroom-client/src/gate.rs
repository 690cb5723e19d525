//! Role-gated route authorization.

use lockerroom_core::{LockerRoomError, Route, Session};

/// Result of checking a route against the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allow,
    RedirectToLogin,
    /// Signed in, but not allowed here. Carries the role's landing route.
    RedirectTo(Route),
}

impl Access {
    /// Where the actor ends up: `route` itself when allowed.
    pub fn destination(&self, route: Route) -> Route {
        match self {
            Access::Allow => route,
            Access::RedirectToLogin => Route::Login,
            Access::RedirectTo(landing) => *landing,
        }
    }

    /// Authorization failures from the API send the actor back to login.
    /// Other errors leave navigation alone.
    pub fn for_error(err: &LockerRoomError) -> Option<Access> {
        err.requires_reauth().then_some(Access::RedirectToLogin)
    }
}

/// Decide whether the holder of `session` may open `route`.
pub fn authorize(route: &Route, session: Option<&Session>) -> Access {
    let Some(session) = session else {
        return if route.is_public() {
            Access::Allow
        } else {
            Access::RedirectToLogin
        };
    };
    if route.is_public() {
        // Signed-in actors skip the login screen.
        return Access::RedirectTo(session.role.landing());
    }
    if route.allows(session.role) {
        Access::Allow
    } else {
        tracing::debug!(
            role = %session.role,
            route = %route.path(),
            "Route not allowed for role"
        );
        Access::RedirectTo(session.role.landing())
    }
}
