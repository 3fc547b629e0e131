//! HTTP surface of the reference server: routing, bearer authentication,
//! multipart decoding, and error mapping.
//!
//! Every route lives under `/api`. Failures are answered with a JSON body
//! `{ "message": ... }` and a status derived from [`StoreError`].

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{DefaultBodyLimit, FromRequestParts, Multipart, Path, Query, State};
use axum::http::request::Parts;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use taskdesk_proto::auth::{AuthResponse, ErrorBody, LoginRequest, RegisterRequest};
use taskdesk_proto::page::Page;
use taskdesk_proto::query::{
    DEFAULT_PAGE_SIZE, SortDirection, TaskQuery, TaskSortField, UserQuery, UserSortField,
};
use taskdesk_proto::task::{DocumentId, Task, TaskFields, TaskId, UploadFile};
use taskdesk_proto::user::{NewUser, User, UserId, UserUpdate};

use crate::store::{StoreError, TaskStore};

/// Default maximum request body size in bytes (10 MiB).
const DEFAULT_MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024;

/// Shared server state.
pub struct AppState {
    /// All persisted records.
    pub store: TaskStore,
    max_upload_size: usize,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    /// Creates a state with an empty store and the default upload limit.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(DEFAULT_MAX_UPLOAD_SIZE, TaskStore::new())
    }

    /// Creates a state with a custom upload limit and store.
    #[must_use]
    pub const fn with_config(max_upload_size: usize, store: TaskStore) -> Self {
        Self {
            store,
            max_upload_size,
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A failed request: status plus the message sent in the error body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiFailure {
    status: StatusCode,
    message: String,
}

impl ApiFailure {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<StoreError> for ApiFailure {
    fn from(err: StoreError) -> Self {
        let status = match err {
            StoreError::BadRequest(_) => StatusCode::BAD_REQUEST,
            StoreError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            StoreError::Forbidden(_) => StatusCode::FORBIDDEN,
            StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiFailure {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for ApiFailure {
    fn from(rejection: PathRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiFailure {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        tracing::debug!(status = self.status.as_u16(), message = %self.message, "request failed");
        (
            self.status,
            Json(ErrorBody {
                message: self.message,
            }),
        )
            .into_response()
    }
}

type ApiResult<T> = Result<T, ApiFailure>;

// ---------------------------------------------------------------------------
// Authentication extractors
// ---------------------------------------------------------------------------

/// The authenticated caller, resolved from `Authorization: Bearer <token>`.
pub struct Caller(pub User);

impl FromRequestParts<Arc<AppState>> for Caller {
    type Rejection = ApiFailure;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(StoreError::Unauthorized("Authentication required"))?;
        let user = state.store.authenticate(token).await?;
        Ok(Self(user))
    }
}

/// An authenticated caller holding the `ADMIN` role.
pub struct AdminCaller(pub User);

impl FromRequestParts<Arc<AppState>> for AdminCaller {
    type Rejection = ApiFailure;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let Caller(user) = Caller::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            tracing::warn!(user_id = %user.id, "non-admin refused user management");
            return Err(StoreError::Forbidden("Admin role required").into());
        }
        Ok(Self(user))
    }
}

// ---------------------------------------------------------------------------
// Request decoding
// ---------------------------------------------------------------------------

/// Raw list parameters. Empty strings count as absent.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListParams {
    status: Option<String>,
    priority: Option<String>,
    due_date: Option<String>,
    page: Option<u32>,
    size: Option<u32>,
    sort_by: Option<String>,
    sort_dir: Option<String>,
}

fn parse_opt<T>(raw: Option<&String>) -> ApiResult<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(parse_value)
        .transpose()
}

fn parse_value<T>(raw: &str) -> ApiResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e: T::Err| ApiFailure::bad_request(e.to_string()))
}

fn parse_date(raw: &str) -> ApiResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| ApiFailure::bad_request(format!("invalid date {raw:?}, expected YYYY-MM-DD")))
}

impl ListParams {
    fn direction(&self) -> ApiResult<SortDirection> {
        Ok(parse_opt(self.sort_dir.as_ref())?.unwrap_or(SortDirection::Asc))
    }

    fn task_query(&self) -> ApiResult<TaskQuery> {
        let due_date = match self.due_date.as_deref().filter(|s| !s.trim().is_empty()) {
            Some(raw) => Some(parse_date(raw)?),
            None => None,
        };
        Ok(TaskQuery {
            status: parse_opt(self.status.as_ref())?,
            priority: parse_opt(self.priority.as_ref())?,
            due_date,
            page: self.page.unwrap_or(0),
            size: self.size.unwrap_or(DEFAULT_PAGE_SIZE),
            sort_by: parse_opt(self.sort_by.as_ref())?.unwrap_or(TaskSortField::Id),
            sort_dir: self.direction()?,
        })
    }

    fn user_query(&self) -> ApiResult<UserQuery> {
        Ok(UserQuery {
            page: self.page.unwrap_or(0),
            size: self.size.unwrap_or(DEFAULT_PAGE_SIZE),
            sort_by: parse_opt(self.sort_by.as_ref())?.unwrap_or(UserSortField::Id),
            sort_dir: self.direction()?,
        })
    }
}

fn task_fields(text: &HashMap<String, String>) -> ApiResult<TaskFields> {
    let required = |key: &str| {
        text.get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ApiFailure::bad_request(format!("{key} is required")))
    };
    let assigned_to_id = match text.get("assignedToId").map(|s| s.trim()) {
        Some(raw) if !raw.is_empty() => Some(UserId::new(raw.parse::<i64>().map_err(|_| {
            ApiFailure::bad_request(format!("invalid assignedToId {raw:?}"))
        })?)),
        _ => None,
    };
    Ok(TaskFields {
        title: text.get("title").cloned().unwrap_or_default(),
        description: text.get("description").cloned().unwrap_or_default(),
        status: parse_value(required("status")?)?,
        priority: parse_value(required("priority")?)?,
        due_date: parse_date(required("dueDate")?)?,
        assigned_to_id,
    })
}

/// Splits a multipart task body into scalar fields and `files` parts.
/// Empty file parts (no name, no content) are skipped.
async fn task_form(mut multipart: Multipart) -> ApiResult<(TaskFields, Vec<UploadFile>)> {
    let mut text = HashMap::new();
    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiFailure::bad_request(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "files" {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let media_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let content = field
                .bytes()
                .await
                .map_err(|e| ApiFailure::bad_request(e.body_text()))?;
            if file_name.is_empty() && content.is_empty() {
                continue;
            }
            files.push(UploadFile::new(file_name, media_type, content.to_vec()));
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| ApiFailure::bad_request(e.body_text()))?;
            text.insert(name, value);
        }
    }
    Ok((task_fields(&text)?, files))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn register(
    State(state): State<Arc<AppState>>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<Json<AuthResponse>> {
    let Json(request) = body?;
    Ok(Json(state.store.register(&request).await?))
}

async fn login(
    State(state): State<Arc<AppState>>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<AuthResponse>> {
    let Json(request) = body?;
    let auth = state.store.login(&request).await.inspect_err(|_| {
        tracing::info!(email = %request.email, "login refused");
    })?;
    Ok(Json(auth))
}

async fn list_tasks(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    params: Result<Query<ListParams>, QueryRejection>,
) -> ApiResult<Json<Page<Task>>> {
    let Query(params) = params?;
    let query = params.task_query()?;
    Ok(Json(state.store.list_tasks(&user, &query).await))
}

async fn get_task(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Task>> {
    let Path(id) = id?;
    Ok(Json(state.store.get_task(&user, TaskId::new(id)).await?))
}

async fn create_task(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    multipart: Multipart,
) -> ApiResult<Json<Task>> {
    let (fields, files) = task_form(multipart).await?;
    Ok(Json(state.store.create_task(&user, &fields, files).await?))
}

async fn update_task(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    id: Result<Path<i64>, PathRejection>,
    multipart: Multipart,
) -> ApiResult<Json<Task>> {
    let Path(id) = id?;
    let (fields, files) = task_form(multipart).await?;
    let task = state
        .store
        .update_task(&user, TaskId::new(id), &fields, files)
        .await?;
    Ok(Json(task))
}

async fn delete_task(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(id) = id?;
    state.store.delete_task(&user, TaskId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn download_document(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Response> {
    let Path(id) = id?;
    let (meta, content) = state.store.document(&user, DocumentId::new(id)).await?;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        meta.file_name.replace(['"', '\\', '\r', '\n'], "_")
    );
    let headers = [
        (header::CONTENT_TYPE, meta.file_type),
        (header::CONTENT_DISPOSITION, disposition),
    ];
    Ok((headers, content).into_response())
}

async fn delete_document(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(id) = id?;
    state.store.delete_document(&user, DocumentId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_users(
    State(state): State<Arc<AppState>>,
    AdminCaller(_): AdminCaller,
    params: Result<Query<ListParams>, QueryRejection>,
) -> ApiResult<Json<Page<User>>> {
    let Query(params) = params?;
    let query = params.user_query()?;
    Ok(Json(state.store.list_users(&query).await))
}

async fn get_user(
    State(state): State<Arc<AppState>>,
    AdminCaller(_): AdminCaller,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<User>> {
    let Path(id) = id?;
    Ok(Json(state.store.get_user(UserId::new(id)).await?))
}

async fn create_user(
    State(state): State<Arc<AppState>>,
    AdminCaller(_): AdminCaller,
    body: Result<Json<NewUser>, JsonRejection>,
) -> ApiResult<Json<User>> {
    let Json(new_user) = body?;
    Ok(Json(state.store.create_user(&new_user).await?))
}

async fn update_user(
    State(state): State<Arc<AppState>>,
    AdminCaller(_): AdminCaller,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<UserUpdate>, JsonRejection>,
) -> ApiResult<Json<User>> {
    let Path(id) = id?;
    let Json(update) = body?;
    Ok(Json(state.store.update_user(UserId::new(id), &update).await?))
}

async fn delete_user(
    State(state): State<Arc<AppState>>,
    AdminCaller(_): AdminCaller,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(id) = id?;
    state.store.delete_user(UserId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Server bootstrap
// ---------------------------------------------------------------------------

/// Builds the full router, with every route under `/api`.
pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/tasks", get(list_tasks).post(create_task))
        .route(
            "/tasks/{id}",
            get(get_task).put(update_task).delete(delete_task),
        )
        .route(
            "/tasks/documents/{id}",
            get(download_document).delete(delete_document),
        )
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/{id}",
            get(get_user).put(update_user).delete(delete_user),
        );

    Router::new()
        .nest("/api", api)
        .layer(DefaultBodyLimit::max(state.max_upload_size))
        .with_state(state)
}

/// Starts the server with an empty store on the given address.
///
/// Returns the bound address (useful when binding to port 0) and a
/// [`tokio::task::JoinHandle`] for the server task.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server(
    addr: &str,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    start_server_with_state(addr, Arc::new(AppState::new())).await
}

/// Starts the server with a pre-configured [`AppState`].
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server_with_state(
    addr: &str,
    state: Arc<AppState>,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "server error");
        }
    });

    Ok((bound_addr, handle))
}

/// Starts a server on `127.0.0.1:0` seeded with `admin@example.com` /
/// `admin`, returning the API base URL.
#[cfg(test)]
pub async fn start_test_server() -> (String, tokio::task::JoinHandle<()>) {
    let store = TaskStore::with_admin("admin@example.com", "admin").expect("seed admin");
    let state = Arc::new(AppState::with_config(DEFAULT_MAX_UPLOAD_SIZE, store));
    let (addr, handle) = start_server_with_state("127.0.0.1:0", state)
        .await
        .expect("failed to start test server");
    (format!("http://{addr}/api"), handle)
}
