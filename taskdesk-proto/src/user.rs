//! User and role types.
//!
//! Passwords are write-only: [`User`] has no password field, so no read
//! response can carry one back to the client.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::task::UnknownVariant;

/// Server-assigned user identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

impl UserId {
    /// Wraps a raw identifier.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw identifier.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Authorization role of a user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Regular user: sees and edits own tasks only.
    #[default]
    User,
    /// Administrator: sees all tasks and manages users.
    Admin,
}

impl Role {
    /// Wire representation (`USER`, `ADMIN`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USER" => Ok(Self::User),
            "ADMIN" => Ok(Self::Admin),
            other => Err(UnknownVariant::new("role", other)),
        }
    }
}

/// A user as returned by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User identifier.
    pub id: UserId,
    /// Unique email, used as the display key.
    pub email: String,
    /// Role.
    pub role: Role,
}

impl User {
    /// Returns true if this user holds the administrator role.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Body of a create-user request.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    /// Email (required).
    pub email: String,
    /// Initial password (required).
    pub password: String,
    /// Role.
    pub role: Role,
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("email", &self.email)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

/// Body of an update-user request.
///
/// A `None` password is omitted from the JSON body, which the server reads
/// as "keep the current password". An empty string is never sent.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserUpdate {
    /// New email.
    pub email: String,
    /// Replacement password, or `None` to leave it unchanged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// New role.
    pub role: Role,
}

impl UserUpdate {
    /// Builds an update from form input, mapping an empty password to
    /// "unchanged".
    pub fn from_form(email: impl Into<String>, password: &str, role: Role) -> Self {
        Self {
            email: email.into(),
            password: (!password.is_empty()).then(|| password.to_string()),
            role,
        }
    }
}

impl fmt::Debug for UserUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserUpdate")
            .field("email", &self.email)
            .field("password_changed", &self.password.is_some())
            .field("role", &self.role)
            .finish()
    }
}
