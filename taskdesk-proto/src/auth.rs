//! Authentication request and response bodies.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::user::{Role, User, UserId};

/// Body of `POST /auth/login`.
#[derive(Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    /// Account email.
    pub email: String,
    /// Account password.
    pub password: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Body of `POST /auth/register`.
///
/// The server assigns [`Role::User`] when `role` is absent.
#[derive(Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    /// Account email.
    pub email: String,
    /// Account password.
    pub password: String,
    /// Requested role.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("email", &self.email)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

/// Successful login or registration.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    /// Bearer token for subsequent requests.
    pub token: String,
    /// Email of the authenticated user.
    pub email: String,
    /// Role of the authenticated user.
    pub role: Role,
    /// Identifier of the authenticated user.
    pub id: UserId,
}

impl AuthResponse {
    /// The authenticated identity, without the token.
    #[must_use]
    pub fn user(&self) -> User {
        User {
            id: self.id,
            email: self.email.clone(),
            role: self.role,
        }
    }
}

impl fmt::Debug for AuthResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthResponse")
            .field("email", &self.email)
            .field("role", &self.role)
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// Error body returned by the server for any failed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable reason.
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_without_role_omits_field() {
        let req = RegisterRequest {
            email: "a@x".to_string(),
            password: "pw".to_string(),
            role: None,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("role").is_none());
    }

    #[test]
    fn auth_response_user_projection() {
        let resp: AuthResponse = serde_json::from_str(
            r#"{"token":"abc","email":"a@x","role":"ADMIN","id":9}"#,
        )
        .unwrap();
        let user = resp.user();
        assert_eq!(user.id, UserId::new(9));
        assert!(user.is_admin());
        assert!(!format!("{resp:?}").contains("abc"));
    }
}
