//! HTTP implementation of [`TaskApi`] on top of `reqwest`.
//!
//! Every request reads the bearer token from the injected [`SessionStore`]
//! at send time, so signing in or out takes effect on the next call without
//! rebuilding the client. Non-success responses are mapped onto
//! [`ApiError`] using the `{ "message": ... }` error body when present.

use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use taskdesk_proto::auth::{AuthResponse, ErrorBody, LoginRequest, RegisterRequest};
use taskdesk_proto::page::Page;
use taskdesk_proto::query::{PageQuery, TaskQuery, UserQuery};
use taskdesk_proto::task::{DocumentId, Task, TaskFields, TaskId, UploadFile};
use taskdesk_proto::user::{NewUser, User, UserId, UserUpdate};
use url::Url;

use super::{ApiError, TaskApi};
use crate::session::SessionStore;

/// `reqwest`-backed API client.
#[derive(Debug, Clone)]
pub struct HttpApiClient {
    http: reqwest::Client,
    base: Url,
    session: SessionStore,
}

impl HttpApiClient {
    /// Creates a client rooted at `base_url` (e.g. `http://localhost:8080/api`).
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Network`] if the URL is invalid or the underlying
    /// client cannot be built.
    pub fn new(base_url: &str, timeout: Duration, session: SessionStore) -> Result<Self, ApiError> {
        let mut base =
            Url::parse(base_url).map_err(|e| ApiError::Network(format!("bad base url: {e}")))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Ok(Self {
            http,
            base,
            session,
        })
    }

    /// The session this client authenticates with.
    #[must_use]
    pub const fn session(&self) -> &SessionStore {
        &self.session
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.base
            .join(path)
            .map_err(|e| ApiError::Network(format!("bad request path {path}: {e}")))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.session.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(transport_error)?;
        check_status(response).await
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = self.send(request).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn send_empty(&self, request: RequestBuilder) -> Result<(), ApiError> {
        self.send(request).await.map(drop)
    }
}

fn transport_error(err: reqwest::Error) -> ApiError {
    if err.is_decode() {
        ApiError::Decode(err.to_string())
    } else {
        ApiError::Network(err.to_string())
    }
}

async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|b| b.message)
        .ok()
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
    tracing::debug!(status = status.as_u16(), %message, "request rejected");
    Err(ApiError::from_status(status.as_u16(), message))
}

/// Builds the multipart body for a create or update mutation.
fn task_form(fields: &TaskFields, files: &[UploadFile]) -> Result<Form, ApiError> {
    let mut form = Form::new();
    for (name, value) in fields.form_pairs() {
        form = form.text(name, value);
    }
    for file in files {
        let part = Part::bytes(file.content.clone())
            .file_name(file.file_name.clone())
            .mime_str(&file.media_type)
            .map_err(|e| ApiError::Network(format!("failed to build upload part: {e}")))?;
        form = form.part("files", part);
    }
    Ok(form)
}

impl TaskApi for HttpApiClient {
    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ApiError> {
        let url = self.url("auth/login")?;
        self.send_json(self.http.post(url).json(request)).await
    }

    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ApiError> {
        let url = self.url("auth/register")?;
        self.send_json(self.http.post(url).json(request)).await
    }

    async fn list_tasks(&self, query: &TaskQuery) -> Result<Page<Task>, ApiError> {
        let url = self.url("tasks")?;
        self.send_json(self.http.get(url).query(&query.query_pairs()))
            .await
    }

    async fn get_task(&self, id: TaskId) -> Result<Task, ApiError> {
        let url = self.url(&format!("tasks/{id}"))?;
        self.send_json(self.http.get(url)).await
    }

    async fn create_task(&self, fields: &TaskFields, files: &[UploadFile]) -> Result<Task, ApiError> {
        let url = self.url("tasks")?;
        let form = task_form(fields, files)?;
        self.send_json(self.http.post(url).multipart(form)).await
    }

    async fn update_task(
        &self,
        id: TaskId,
        fields: &TaskFields,
        files: &[UploadFile],
    ) -> Result<Task, ApiError> {
        let url = self.url(&format!("tasks/{id}"))?;
        let form = task_form(fields, files)?;
        self.send_json(self.http.put(url).multipart(form)).await
    }

    async fn delete_task(&self, id: TaskId) -> Result<(), ApiError> {
        let url = self.url(&format!("tasks/{id}"))?;
        self.send_empty(self.http.delete(url)).await
    }

    async fn download_document(&self, id: DocumentId) -> Result<Vec<u8>, ApiError> {
        let url = self.url(&format!("tasks/documents/{id}"))?;
        let response = self.send(self.http.get(url)).await?;
        let bytes = response.bytes().await.map_err(transport_error)?;
        Ok(bytes.to_vec())
    }

    async fn delete_document(&self, id: DocumentId) -> Result<(), ApiError> {
        let url = self.url(&format!("tasks/documents/{id}"))?;
        self.send_empty(self.http.delete(url)).await
    }

    async fn list_users(&self, query: &UserQuery) -> Result<Page<User>, ApiError> {
        let url = self.url("users")?;
        self.send_json(self.http.get(url).query(&query.query_pairs()))
            .await
    }

    async fn create_user(&self, user: &NewUser) -> Result<User, ApiError> {
        let url = self.url("users")?;
        self.send_json(self.http.post(url).json(user)).await
    }

    async fn update_user(&self, id: UserId, update: &UserUpdate) -> Result<User, ApiError> {
        let url = self.url(&format!("users/{id}"))?;
        self.send_json(self.http.put(url).json(update)).await
    }

    async fn delete_user(&self, id: UserId) -> Result<(), ApiError> {
        let url = self.url(&format!("users/{id}"))?;
        self.send_empty(self.http.delete(url)).await
    }
}
