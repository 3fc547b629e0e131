//! Role gate and route guard.
//!
//! Both are pure predicates over the session; neither performs I/O.

use std::fmt;

use taskdesk_proto::task::TaskId;
use taskdesk_proto::user::{Role, User};

use crate::session::SessionStore;

/// Access denied before any request was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    /// No session is installed.
    #[error("not signed in")]
    NotAuthenticated,
    /// The signed-in user is not an administrator.
    #[error("access denied: admin only")]
    AdminRequired,
}

/// Whether `user` may open user management and load the assignee roster.
#[must_use]
pub fn can_manage_users(user: &User) -> bool {
    user.role == Role::Admin
}

/// Returns the signed-in user.
///
/// # Errors
///
/// [`AccessError::NotAuthenticated`] when signed out.
pub fn require_user(session: &SessionStore) -> Result<User, AccessError> {
    session.user().ok_or(AccessError::NotAuthenticated)
}

/// Returns the signed-in user if they are an administrator.
///
/// # Errors
///
/// [`AccessError::NotAuthenticated`] when signed out,
/// [`AccessError::AdminRequired`] for regular users.
pub fn require_admin(session: &SessionStore) -> Result<User, AccessError> {
    let user = require_user(session)?;
    if can_manage_users(&user) {
        Ok(user)
    } else {
        Err(AccessError::AdminRequired)
    }
}

/// Navigable views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// `/`.
    Root,
    /// `/login`.
    Login,
    /// `/register`.
    Register,
    /// `/dashboard`.
    Dashboard,
    /// `/tasks`.
    Tasks,
    /// `/tasks/{id}`.
    TaskDetail(TaskId),
    /// `/users`.
    Users,
}

impl Route {
    /// Parses a path. Unknown paths yield `None`.
    #[must_use]
    pub fn parse(path: &str) -> Option<Self> {
        let trimmed = path.trim_end_matches('/');
        match trimmed {
            "" => Some(Self::Root),
            "/login" => Some(Self::Login),
            "/register" => Some(Self::Register),
            "/dashboard" => Some(Self::Dashboard),
            "/tasks" => Some(Self::Tasks),
            "/users" => Some(Self::Users),
            other => other
                .strip_prefix("/tasks/")
                .and_then(|id| id.parse::<i64>().ok())
                .map(|id| Self::TaskDetail(TaskId::new(id))),
        }
    }

    /// Returns true for views that need a session.
    #[must_use]
    pub const fn is_protected(self) -> bool {
        matches!(
            self,
            Self::Dashboard | Self::Tasks | Self::TaskDetail(_) | Self::Users
        )
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Root => f.write_str("/"),
            Self::Login => f.write_str("/login"),
            Self::Register => f.write_str("/register"),
            Self::Dashboard => f.write_str("/dashboard"),
            Self::Tasks => f.write_str("/tasks"),
            Self::TaskDetail(id) => write!(f, "/tasks/{id}"),
            Self::Users => f.write_str("/users"),
        }
    }
}

/// Result of guarding a navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    /// Show the requested view.
    Render,
    /// Navigate elsewhere instead.
    Redirect(Route),
}

/// Decides whether `route` may be shown for the current session.
///
/// `Users` renders for any signed-in user; the admin controller shows the
/// access-denied view for non-admins.
#[must_use]
pub fn guard(route: Route, session: &SessionStore) -> RouteDecision {
    let signed_in = session.is_authenticated();
    match route {
        Route::Root => RouteDecision::Redirect(Route::Dashboard),
        Route::Login | Route::Register if signed_in => RouteDecision::Redirect(Route::Dashboard),
        r if r.is_protected() && !signed_in => RouteDecision::Redirect(Route::Login),
        _ => RouteDecision::Render,
    }
}

/// Navigation entries visible to the current user.
#[must_use]
pub fn nav_links(session: &SessionStore) -> Vec<Route> {
    match session.user() {
        None => vec![Route::Login, Route::Register],
        Some(user) if can_manage_users(&user) => {
            vec![Route::Dashboard, Route::Tasks, Route::Users]
        }
        Some(_) => vec![Route::Dashboard, Route::Tasks],
    }
}
