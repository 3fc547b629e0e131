//! Scripted in-process API for testing.
//!
//! [`LoopbackApi`] answers each endpoint from a FIFO of pre-loaded replies
//! and records every call it receives. A reply can be gated behind a
//! [`tokio::sync::oneshot`] channel so tests decide exactly when (and in
//! which order) overlapping requests complete.

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;
use taskdesk_proto::auth::{AuthResponse, LoginRequest, RegisterRequest};
use taskdesk_proto::page::Page;
use taskdesk_proto::query::{TaskQuery, UserQuery};
use taskdesk_proto::task::{DocumentId, Task, TaskFields, TaskId, UploadFile};
use taskdesk_proto::user::{NewUser, Role, User, UserId, UserUpdate};
use tokio::sync::oneshot;

use super::{ApiError, TaskApi};

/// Identifies an API endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// `POST /auth/login`.
    Login,
    /// `POST /auth/register`.
    Register,
    /// `GET /tasks`.
    ListTasks,
    /// `GET /tasks/{id}`.
    GetTask,
    /// `POST /tasks`.
    CreateTask,
    /// `PUT /tasks/{id}`.
    UpdateTask,
    /// `DELETE /tasks/{id}`.
    DeleteTask,
    /// `GET /tasks/documents/{id}`.
    DownloadDocument,
    /// `DELETE /tasks/documents/{id}`.
    DeleteDocument,
    /// `GET /users`.
    ListUsers,
    /// `POST /users`.
    CreateUser,
    /// `PUT /users/{id}`.
    UpdateUser,
    /// `DELETE /users/{id}`.
    DeleteUser,
}

/// A recorded request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// Login attempt for an email.
    Login(String),
    /// Registration for an email.
    Register(String),
    /// Task list with this descriptor.
    ListTasks(TaskQuery),
    /// Single task fetch.
    GetTask(TaskId),
    /// Task creation with the names of the attached files.
    CreateTask {
        /// Scalar fields sent.
        fields: TaskFields,
        /// Attached file names, in order.
        file_names: Vec<String>,
    },
    /// Task update with the names of the attached files.
    UpdateTask {
        /// Target task.
        id: TaskId,
        /// Scalar fields sent.
        fields: TaskFields,
        /// Attached file names, in order.
        file_names: Vec<String>,
    },
    /// Task deletion.
    DeleteTask(TaskId),
    /// Document download.
    DownloadDocument(DocumentId),
    /// Document deletion.
    DeleteDocument(DocumentId),
    /// User list with this descriptor.
    ListUsers(UserQuery),
    /// User creation.
    CreateUser {
        /// New email.
        email: String,
        /// New role.
        role: Role,
    },
    /// User update.
    UpdateUser {
        /// Target user.
        id: UserId,
        /// Body sent.
        update: UserUpdate,
    },
    /// User deletion.
    DeleteUser(UserId),
}

impl Call {
    /// The endpoint this call addressed.
    #[must_use]
    pub const fn endpoint(&self) -> Endpoint {
        match self {
            Self::Login(_) => Endpoint::Login,
            Self::Register(_) => Endpoint::Register,
            Self::ListTasks(_) => Endpoint::ListTasks,
            Self::GetTask(_) => Endpoint::GetTask,
            Self::CreateTask { .. } => Endpoint::CreateTask,
            Self::UpdateTask { .. } => Endpoint::UpdateTask,
            Self::DeleteTask(_) => Endpoint::DeleteTask,
            Self::DownloadDocument(_) => Endpoint::DownloadDocument,
            Self::DeleteDocument(_) => Endpoint::DeleteDocument,
            Self::ListUsers(_) => Endpoint::ListUsers,
            Self::CreateUser { .. } => Endpoint::CreateUser,
            Self::UpdateUser { .. } => Endpoint::UpdateUser,
            Self::DeleteUser(_) => Endpoint::DeleteUser,
        }
    }
}

/// A scripted successful response body.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Login or registration result.
    Auth(AuthResponse),
    /// A page of tasks.
    Tasks(Page<Task>),
    /// A single task.
    Task(Task),
    /// A page of users.
    Users(Page<User>),
    /// A single user.
    User(User),
    /// Raw document content.
    Bytes(Vec<u8>),
    /// No body.
    Empty,
}

struct Step {
    result: Result<Reply, ApiError>,
    gate: Option<oneshot::Receiver<()>>,
}

#[derive(Default)]
struct Script {
    replies: HashMap<Endpoint, VecDeque<Step>>,
    calls: Vec<Call>,
}

/// In-process [`TaskApi`] answering from scripted replies.
///
/// A call with no scripted reply fails with [`ApiError::Network`], which
/// keeps unexpected requests visible in test failures.
#[derive(Default)]
pub struct LoopbackApi {
    script: Mutex<Script>,
}

impl LoopbackApi {
    /// Creates an API with no scripted replies.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a reply for the next call to `endpoint`.
    pub fn reply(&self, endpoint: Endpoint, result: Result<Reply, ApiError>) {
        self.push(endpoint, result, None);
    }

    /// Queues a reply that is withheld until the returned sender fires (or
    /// is dropped).
    pub fn reply_gated(
        &self,
        endpoint: Endpoint,
        result: Result<Reply, ApiError>,
    ) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.push(endpoint, result, Some(rx));
        tx
    }

    fn push(
        &self,
        endpoint: Endpoint,
        result: Result<Reply, ApiError>,
        gate: Option<oneshot::Receiver<()>>,
    ) {
        self.script
            .lock()
            .replies
            .entry(endpoint)
            .or_default()
            .push_back(Step { result, gate });
    }

    /// Every call received so far, in arrival order.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.script.lock().calls.clone()
    }

    /// Number of calls received for one endpoint.
    #[must_use]
    pub fn call_count(&self, endpoint: Endpoint) -> usize {
        self.script
            .lock()
            .calls
            .iter()
            .filter(|c| c.endpoint() == endpoint)
            .count()
    }

    async fn answer(&self, call: Call) -> Result<Reply, ApiError> {
        let endpoint = call.endpoint();
        let step = {
            let mut script = self.script.lock();
            script.calls.push(call);
            script
                .replies
                .get_mut(&endpoint)
                .and_then(VecDeque::pop_front)
        };
        let Some(step) = step else {
            return Err(ApiError::Network(format!(
                "no scripted reply for {endpoint:?}"
            )));
        };
        if let Some(gate) = step.gate {
            // A dropped sender releases the reply as well.
            let _ = gate.await;
        }
        step.result
    }
}

fn unexpected(endpoint: &str, reply: &Reply) -> ApiError {
    ApiError::Decode(format!("{endpoint}: unexpected scripted reply {reply:?}"))
}

fn file_names(files: &[UploadFile]) -> Vec<String> {
    files.iter().map(|f| f.file_name.clone()).collect()
}

impl TaskApi for LoopbackApi {
    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ApiError> {
        match self.answer(Call::Login(request.email.clone())).await? {
            Reply::Auth(auth) => Ok(auth),
            other => Err(unexpected("login", &other)),
        }
    }

    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ApiError> {
        match self.answer(Call::Register(request.email.clone())).await? {
            Reply::Auth(auth) => Ok(auth),
            other => Err(unexpected("register", &other)),
        }
    }

    async fn list_tasks(&self, query: &TaskQuery) -> Result<Page<Task>, ApiError> {
        match self.answer(Call::ListTasks(query.clone())).await? {
            Reply::Tasks(page) => Ok(page),
            other => Err(unexpected("list_tasks", &other)),
        }
    }

    async fn get_task(&self, id: TaskId) -> Result<Task, ApiError> {
        match self.answer(Call::GetTask(id)).await? {
            Reply::Task(task) => Ok(task),
            other => Err(unexpected("get_task", &other)),
        }
    }

    async fn create_task(&self, fields: &TaskFields, files: &[UploadFile]) -> Result<Task, ApiError> {
        let call = Call::CreateTask {
            fields: fields.clone(),
            file_names: file_names(files),
        };
        match self.answer(call).await? {
            Reply::Task(task) => Ok(task),
            other => Err(unexpected("create_task", &other)),
        }
    }

    async fn update_task(
        &self,
        id: TaskId,
        fields: &TaskFields,
        files: &[UploadFile],
    ) -> Result<Task, ApiError> {
        let call = Call::UpdateTask {
            id,
            fields: fields.clone(),
            file_names: file_names(files),
        };
        match self.answer(call).await? {
            Reply::Task(task) => Ok(task),
            other => Err(unexpected("update_task", &other)),
        }
    }

    async fn delete_task(&self, id: TaskId) -> Result<(), ApiError> {
        self.answer(Call::DeleteTask(id)).await.map(drop)
    }

    async fn download_document(&self, id: DocumentId) -> Result<Vec<u8>, ApiError> {
        match self.answer(Call::DownloadDocument(id)).await? {
            Reply::Bytes(bytes) => Ok(bytes),
            other => Err(unexpected("download_document", &other)),
        }
    }

    async fn delete_document(&self, id: DocumentId) -> Result<(), ApiError> {
        self.answer(Call::DeleteDocument(id)).await.map(drop)
    }

    async fn list_users(&self, query: &UserQuery) -> Result<Page<User>, ApiError> {
        match self.answer(Call::ListUsers(query.clone())).await? {
            Reply::Users(page) => Ok(page),
            other => Err(unexpected("list_users", &other)),
        }
    }

    async fn create_user(&self, user: &NewUser) -> Result<User, ApiError> {
        let call = Call::CreateUser {
            email: user.email.clone(),
            role: user.role,
        };
        match self.answer(call).await? {
            Reply::User(user) => Ok(user),
            other => Err(unexpected("create_user", &other)),
        }
    }

    async fn update_user(&self, id: UserId, update: &UserUpdate) -> Result<User, ApiError> {
        let call = Call::UpdateUser {
            id,
            update: update.clone(),
        };
        match self.answer(call).await? {
            Reply::User(user) => Ok(user),
            other => Err(unexpected("update_user", &other)),
        }
    }

    async fn delete_user(&self, id: UserId) -> Result<(), ApiError> {
        self.answer(Call::DeleteUser(id)).await.map(drop)
    }
}
