//! API client abstraction for the `TaskDesk` REST service.
//!
//! Defines the [`TaskApi`] trait every controller is generic over.
//! Implementations:
//! - [`http::HttpApiClient`] - reqwest-based client against a live server
//! - [`loopback::LoopbackApi`] - scripted in-process double for tests

pub mod http;
pub mod loopback;

use std::future::Future;

use taskdesk_proto::auth::{AuthResponse, LoginRequest, RegisterRequest};
use taskdesk_proto::page::Page;
use taskdesk_proto::query::{TaskQuery, UserQuery};
use taskdesk_proto::task::{DocumentId, Task, TaskFields, TaskId, UploadFile};
use taskdesk_proto::user::{NewUser, User, UserId, UserUpdate};

/// Errors surfaced by an API call.
///
/// Cloneable so that a failure can be both returned to the caller and kept
/// in view state for rendering.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The addressed resource does not exist (HTTP 404).
    #[error("not found: {0}")]
    NotFound(String),

    /// No valid session token (HTTP 401).
    #[error("not authenticated")]
    Unauthorized,

    /// The session is valid but lacks permission (HTTP 403).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Any other non-success status. `message` comes from the error body
    /// when the server sent one.
    #[error("server error ({status}): {message}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Server-provided reason.
        message: String,
    },

    /// The request never produced a response (connect, timeout, reset).
    #[error("network error: {0}")]
    Network(String),

    /// A response arrived but its body could not be decoded.
    #[error("invalid response body: {0}")]
    Decode(String),
}

impl ApiError {
    /// Maps a non-success HTTP status and its message onto a variant.
    #[must_use]
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            401 => Self::Unauthorized,
            403 => Self::Forbidden(message),
            404 => Self::NotFound(message),
            _ => Self::Server { status, message },
        }
    }

    /// Returns true for [`ApiError::NotFound`].
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Text suitable for an inline form error or alert.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::NotFound(m) | Self::Forbidden(m) | Self::Server { message: m, .. } => m.clone(),
            Self::Unauthorized => "Please sign in again".to_string(),
            Self::Network(_) => "The server could not be reached".to_string(),
            Self::Decode(_) => "The server sent an unexpected response".to_string(),
        }
    }
}

/// Async client for the task-management API.
///
/// One method per endpoint. Implementations attach whatever credentials the
/// current session holds; controllers never handle tokens.
pub trait TaskApi: Send + Sync {
    /// `POST /auth/login`.
    fn login(
        &self,
        request: &LoginRequest,
    ) -> impl Future<Output = Result<AuthResponse, ApiError>> + Send;

    /// `POST /auth/register`.
    fn register(
        &self,
        request: &RegisterRequest,
    ) -> impl Future<Output = Result<AuthResponse, ApiError>> + Send;

    /// `GET /tasks` with the descriptor encoded as query parameters.
    fn list_tasks(
        &self,
        query: &TaskQuery,
    ) -> impl Future<Output = Result<Page<Task>, ApiError>> + Send;

    /// `GET /tasks/{id}`.
    fn get_task(&self, id: TaskId) -> impl Future<Output = Result<Task, ApiError>> + Send;

    /// `POST /tasks` as multipart: scalar fields plus zero to three files.
    fn create_task(
        &self,
        fields: &TaskFields,
        files: &[UploadFile],
    ) -> impl Future<Output = Result<Task, ApiError>> + Send;

    /// `PUT /tasks/{id}` as multipart. Files are appended to the task.
    fn update_task(
        &self,
        id: TaskId,
        fields: &TaskFields,
        files: &[UploadFile],
    ) -> impl Future<Output = Result<Task, ApiError>> + Send;

    /// `DELETE /tasks/{id}`.
    fn delete_task(&self, id: TaskId) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// `GET /tasks/documents/{id}`: the raw document content.
    fn download_document(
        &self,
        id: DocumentId,
    ) -> impl Future<Output = Result<Vec<u8>, ApiError>> + Send;

    /// `DELETE /tasks/documents/{id}`.
    fn delete_document(
        &self,
        id: DocumentId,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// `GET /users` with pagination and sort.
    fn list_users(
        &self,
        query: &UserQuery,
    ) -> impl Future<Output = Result<Page<User>, ApiError>> + Send;

    /// `POST /users`.
    fn create_user(&self, user: &NewUser)
    -> impl Future<Output = Result<User, ApiError>> + Send;

    /// `PUT /users/{id}`. An absent password leaves it unchanged.
    fn update_user(
        &self,
        id: UserId,
        update: &UserUpdate,
    ) -> impl Future<Output = Result<User, ApiError>> + Send;

    /// `DELETE /users/{id}`.
    fn delete_user(&self, id: UserId) -> impl Future<Output = Result<(), ApiError>> + Send;
}
