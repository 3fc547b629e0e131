//! Process-wide session: bearer token plus the authenticated user.
//!
//! A [`SessionStore`] is created empty, initialised by [`login`] or
//! [`register`], and torn down by [`SessionStore::end`]. Clones share the
//! same underlying slot, so the HTTP client and the role gate always see
//! the same session.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use taskdesk_proto::auth::{AuthResponse, LoginRequest, RegisterRequest};
use taskdesk_proto::user::{Role, User};

use crate::api::{ApiError, TaskApi};

/// Errors from establishing a session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// Email or password was empty; no request was made.
    #[error("email and password are required")]
    MissingCredentials,

    /// The server rejected the credentials or could not be reached.
    #[error("authentication failed: {0}")]
    Api(#[from] ApiError),
}

/// An authenticated session.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    /// Bearer token.
    pub token: String,
    /// The signed-in user.
    pub user: User,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

/// Shared handle to the current session.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    slot: Arc<RwLock<Option<Session>>>,
}

impl SessionStore {
    /// Creates an empty (signed-out) store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs the session described by an auth response, replacing any
    /// previous one. Returns the signed-in user.
    pub fn begin(&self, auth: &AuthResponse) -> User {
        let user = auth.user();
        *self.slot.write() = Some(Session {
            token: auth.token.clone(),
            user: user.clone(),
        });
        tracing::info!(user_id = %user.id, role = %user.role, "session started");
        user
    }

    /// Clears the session. Idempotent.
    pub fn end(&self) {
        if self.slot.write().take().is_some() {
            tracing::info!("session ended");
        }
    }

    /// Snapshot of the current session.
    #[must_use]
    pub fn current(&self) -> Option<Session> {
        self.slot.read().clone()
    }

    /// Current bearer token.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.slot.read().as_ref().map(|s| s.token.clone())
    }

    /// Current user.
    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.slot.read().as_ref().map(|s| s.user.clone())
    }

    /// Returns true while a session is installed.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.slot.read().is_some()
    }
}

/// Signs in and installs the resulting session.
///
/// # Errors
///
/// [`SessionError::MissingCredentials`] without contacting the server if
/// either field is empty; [`SessionError::Api`] if the server refuses.
pub async fn login<A: TaskApi>(
    api: &A,
    store: &SessionStore,
    email: &str,
    password: &str,
) -> Result<User, SessionError> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(SessionError::MissingCredentials);
    }
    let request = LoginRequest {
        email: email.trim().to_string(),
        password: password.to_string(),
    };
    match api.login(&request).await {
        Ok(auth) => Ok(store.begin(&auth)),
        Err(e) => {
            tracing::warn!(error = %e, "login failed");
            Err(e.into())
        }
    }
}

/// Registers a new account and installs its session.
///
/// # Errors
///
/// Same as [`login`].
pub async fn register<A: TaskApi>(
    api: &A,
    store: &SessionStore,
    email: &str,
    password: &str,
    role: Option<Role>,
) -> Result<User, SessionError> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(SessionError::MissingCredentials);
    }
    let request = RegisterRequest {
        email: email.trim().to_string(),
        password: password.to_string(),
        role,
    };
    let auth = api.register(&request).await?;
    Ok(store.begin(&auth))
}
