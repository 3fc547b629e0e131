//! In-memory task, document, and user store.
//!
//! The [`TaskStore`] owns every record the reference server knows about and
//! enforces the server-side rules: owner scoping for non-admins, the
//! three-PDF attachment limit, and credential checks. Handlers in
//! [`crate::server`] translate [`StoreError`]s into HTTP statuses.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use taskdesk_proto::auth::{AuthResponse, LoginRequest, RegisterRequest};
use taskdesk_proto::page::Page;
use taskdesk_proto::query::{SortDirection, TaskQuery, TaskSortField, UserQuery, UserSortField};
use taskdesk_proto::task::{
    Document, DocumentId, MAX_TASK_DOCUMENTS, PDF_MEDIA_TYPE, Task, TaskFields, TaskId,
    TaskPriority, TaskStatus, UploadFile,
};
use taskdesk_proto::user::{NewUser, Role, User, UserId, UserUpdate};
use tokio::sync::RwLock;

/// Failures surfaced to API callers. The display text is the message body.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Malformed or rule-violating input.
    #[error("{0}")]
    BadRequest(String),

    /// Missing or unknown credentials.
    #[error("{0}")]
    Unauthorized(&'static str),

    /// The caller may not touch this resource.
    #[error("{0}")]
    Forbidden(&'static str),

    /// The resource does not exist.
    #[error("{0}")]
    NotFound(&'static str),
}

impl StoreError {
    fn bad_request(message: &str) -> Self {
        Self::BadRequest(message.to_string())
    }
}

const ACCESS_DENIED: StoreError = StoreError::Forbidden("Access denied");

struct UserRecord {
    id: UserId,
    email: String,
    password: String,
    role: Role,
}

impl UserRecord {
    fn to_user(&self) -> User {
        User {
            id: self.id,
            email: self.email.clone(),
            role: self.role,
        }
    }
}

struct TaskRecord {
    id: TaskId,
    title: String,
    description: String,
    status: TaskStatus,
    priority: TaskPriority,
    due_date: NaiveDate,
    assigned_to: Option<UserId>,
    created_by: UserId,
    documents: Vec<DocumentId>,
}

impl TaskRecord {
    fn visible_to(&self, viewer: &User) -> bool {
        viewer.is_admin() || self.created_by == viewer.id
    }

    fn apply(&mut self, fields: &TaskFields) {
        self.title = fields.title.trim().to_string();
        self.description.clone_from(&fields.description);
        self.status = fields.status;
        self.priority = fields.priority;
        self.due_date = fields.due_date;
        self.assigned_to = fields.assigned_to_id;
    }
}

struct DocumentRecord {
    meta: Document,
    content: Vec<u8>,
}

#[derive(Default)]
struct Inner {
    users: BTreeMap<UserId, UserRecord>,
    tasks: BTreeMap<TaskId, TaskRecord>,
    documents: BTreeMap<DocumentId, DocumentRecord>,
    tokens: HashMap<String, UserId>,
    last_user_id: i64,
    last_task_id: i64,
    last_document_id: i64,
}

impl Inner {
    fn email_taken(&self, email: &str, except: Option<UserId>) -> bool {
        self.users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(email) && Some(u.id) != except)
    }

    fn insert_user(&mut self, email: &str, password: &str, role: Role) -> Result<User, StoreError> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(StoreError::bad_request("Email and password are required"));
        }
        if self.email_taken(email, None) {
            return Err(StoreError::bad_request("Email already registered"));
        }
        self.last_user_id += 1;
        let record = UserRecord {
            id: UserId::new(self.last_user_id),
            email: email.to_string(),
            password: password.to_string(),
            role,
        };
        let user = record.to_user();
        self.users.insert(record.id, record);
        Ok(user)
    }

    fn issue_token(&mut self, user: &User) -> AuthResponse {
        let token = uuid::Uuid::now_v7().simple().to_string();
        self.tokens.insert(token.clone(), user.id);
        AuthResponse {
            token,
            email: user.email.clone(),
            role: user.role,
            id: user.id,
        }
    }

    fn task_for(&self, viewer: &User, id: TaskId) -> Result<&TaskRecord, StoreError> {
        let task = self
            .tasks
            .get(&id)
            .ok_or(StoreError::NotFound("Task not found"))?;
        if !task.visible_to(viewer) {
            return Err(ACCESS_DENIED);
        }
        Ok(task)
    }

    fn document_for(&self, viewer: &User, id: DocumentId) -> Result<&DocumentRecord, StoreError> {
        let document = self
            .documents
            .get(&id)
            .ok_or(StoreError::NotFound("Document not found"))?;
        let visible = self
            .tasks
            .get(&document.meta.task_id)
            .is_some_and(|t| t.visible_to(viewer));
        if !visible {
            return Err(ACCESS_DENIED);
        }
        Ok(document)
    }

    fn check_fields(&self, fields: &TaskFields) -> Result<(), StoreError> {
        if fields.title.trim().is_empty() {
            return Err(StoreError::bad_request("Title is required"));
        }
        if let Some(assignee) = fields.assigned_to_id {
            if !self.users.contains_key(&assignee) {
                return Err(StoreError::bad_request("Assigned user not found"));
            }
        }
        Ok(())
    }

    fn attach(&mut self, task: TaskId, files: Vec<UploadFile>) -> Vec<DocumentId> {
        files
            .into_iter()
            .map(|file| {
                self.last_document_id += 1;
                let id = DocumentId::new(self.last_document_id);
                let meta = Document {
                    id,
                    task_id: task,
                    file_name: file.file_name,
                    file_type: file.media_type,
                    file_size: file.content.len() as u64,
                };
                self.documents.insert(
                    id,
                    DocumentRecord {
                        meta,
                        content: file.content,
                    },
                );
                id
            })
            .collect()
    }

    fn remove_task(&mut self, id: TaskId) {
        if let Some(task) = self.tasks.remove(&id) {
            for doc in task.documents {
                self.documents.remove(&doc);
            }
        }
    }

    fn view(&self, task: &TaskRecord) -> Task {
        let assignee = task.assigned_to.and_then(|id| self.users.get(&id));
        let creator = self.users.get(&task.created_by);
        Task {
            id: task.id,
            title: task.title.clone(),
            description: task.description.clone(),
            status: task.status,
            priority: task.priority,
            due_date: task.due_date,
            assigned_to_id: assignee.map(|u| u.id),
            assigned_to_email: assignee.map(|u| u.email.clone()),
            created_by_id: Some(task.created_by),
            created_by_email: creator.map(|u| u.email.clone()).unwrap_or_default(),
            documents: task
                .documents
                .iter()
                .filter_map(|id| self.documents.get(id))
                .map(|d| d.meta.clone())
                .collect(),
        }
    }
}

fn check_uploads(existing: usize, files: &[UploadFile]) -> Result<(), StoreError> {
    if existing + files.len() > MAX_TASK_DOCUMENTS {
        return Err(StoreError::BadRequest(format!(
            "Maximum {MAX_TASK_DOCUMENTS} documents allowed"
        )));
    }
    if files.iter().any(|f| f.media_type != PDF_MEDIA_TYPE) {
        return Err(StoreError::bad_request("Only PDF files are allowed"));
    }
    Ok(())
}

fn directed(ordering: Ordering, dir: SortDirection) -> Ordering {
    match dir {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    }
}

fn compare_tasks(a: &TaskRecord, b: &TaskRecord, by: TaskSortField) -> Ordering {
    let primary = match by {
        TaskSortField::Id => Ordering::Equal,
        TaskSortField::Title => a.title.cmp(&b.title),
        TaskSortField::Status => a.status.cmp(&b.status),
        TaskSortField::Priority => a.priority.cmp(&b.priority),
        TaskSortField::DueDate => a.due_date.cmp(&b.due_date),
    };
    primary.then(a.id.cmp(&b.id))
}

fn compare_users(a: &UserRecord, b: &UserRecord, by: UserSortField) -> Ordering {
    let primary = match by {
        UserSortField::Id => Ordering::Equal,
        UserSortField::Email => a.email.cmp(&b.email),
        UserSortField::Role => a.role.cmp(&b.role),
    };
    primary.then(a.id.cmp(&b.id))
}

/// Thread-safe in-memory store behind the reference server.
pub struct TaskStore {
    inner: RwLock<Inner>,
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Creates a store with one administrator account.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::BadRequest`] if the email or password is blank.
    pub fn with_admin(email: &str, password: &str) -> Result<Self, StoreError> {
        let mut inner = Inner::default();
        inner.insert_user(email, password, Role::Admin)?;
        Ok(Self {
            inner: RwLock::new(inner),
        })
    }

    // -----------------------------------------------------------------------
    // Authentication
    // -----------------------------------------------------------------------

    /// Creates an account and signs it in. The role defaults to `USER`.
    ///
    /// # Errors
    ///
    /// [`StoreError::BadRequest`] for blank credentials or a taken email.
    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, StoreError> {
        let mut inner = self.inner.write().await;
        let user = inner.insert_user(
            &request.email,
            &request.password,
            request.role.unwrap_or_default(),
        )?;
        tracing::info!(user_id = %user.id, role = %user.role, "account registered");
        Ok(inner.issue_token(&user))
    }

    /// Checks credentials and issues a fresh token.
    ///
    /// # Errors
    ///
    /// [`StoreError::Unauthorized`] if the email or password is wrong.
    pub async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, StoreError> {
        let mut inner = self.inner.write().await;
        let user = inner
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(request.email.trim()))
            .filter(|u| u.password == request.password)
            .map(UserRecord::to_user)
            .ok_or(StoreError::Unauthorized("Invalid email or password"))?;
        Ok(inner.issue_token(&user))
    }

    /// Resolves a bearer token to its user, with the user's current role.
    ///
    /// # Errors
    ///
    /// [`StoreError::Unauthorized`] for unknown or revoked tokens.
    pub async fn authenticate(&self, token: &str) -> Result<User, StoreError> {
        let inner = self.inner.read().await;
        inner
            .tokens
            .get(token)
            .and_then(|id| inner.users.get(id))
            .map(UserRecord::to_user)
            .ok_or(StoreError::Unauthorized("Authentication required"))
    }

    // -----------------------------------------------------------------------
    // Tasks
    // -----------------------------------------------------------------------

    /// Filters, sorts and pages the tasks visible to `viewer`.
    pub async fn list_tasks(&self, viewer: &User, query: &TaskQuery) -> Page<Task> {
        let inner = self.inner.read().await;
        let mut matching: Vec<&TaskRecord> = inner
            .tasks
            .values()
            .filter(|t| t.visible_to(viewer))
            .filter(|t| query.status.is_none_or(|s| t.status == s))
            .filter(|t| query.priority.is_none_or(|p| t.priority == p))
            .filter(|t| query.due_date.is_none_or(|d| t.due_date == d))
            .collect();
        matching.sort_by(|a, b| directed(compare_tasks(a, b, query.sort_by), query.sort_dir));
        let views: Vec<Task> = matching.into_iter().map(|t| inner.view(t)).collect();
        Page::slice(&views, query.page, query.size)
    }

    /// Fetches one task.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] or [`StoreError::Forbidden`].
    pub async fn get_task(&self, viewer: &User, id: TaskId) -> Result<Task, StoreError> {
        let inner = self.inner.read().await;
        let task = inner.task_for(viewer, id)?;
        Ok(inner.view(task))
    }

    /// Creates a task owned by `viewer` with up to three PDF documents.
    ///
    /// Nothing is stored unless every check passes.
    ///
    /// # Errors
    ///
    /// [`StoreError::BadRequest`] for a blank title, unknown assignee, too
    /// many files, or a non-PDF file.
    pub async fn create_task(
        &self,
        viewer: &User,
        fields: &TaskFields,
        files: Vec<UploadFile>,
    ) -> Result<Task, StoreError> {
        let mut inner = self.inner.write().await;
        inner.check_fields(fields)?;
        check_uploads(0, &files)?;

        inner.last_task_id += 1;
        let id = TaskId::new(inner.last_task_id);
        let mut record = TaskRecord {
            id,
            title: String::new(),
            description: String::new(),
            status: fields.status,
            priority: fields.priority,
            due_date: fields.due_date,
            assigned_to: None,
            created_by: viewer.id,
            documents: Vec::new(),
        };
        record.apply(fields);
        record.documents = inner.attach(id, files);
        let task = inner.view(&record);
        inner.tasks.insert(id, record);
        tracing::info!(task_id = %id, owner = %viewer.id, docs = task.documents.len(), "task created");
        Ok(task)
    }

    /// Replaces a task's fields and appends new documents.
    ///
    /// An absent assignee clears the assignment.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`], [`StoreError::Forbidden`], or
    /// [`StoreError::BadRequest`] as for [`TaskStore::create_task`], counting
    /// documents already attached.
    pub async fn update_task(
        &self,
        viewer: &User,
        id: TaskId,
        fields: &TaskFields,
        files: Vec<UploadFile>,
    ) -> Result<Task, StoreError> {
        let mut inner = self.inner.write().await;
        let existing = inner.task_for(viewer, id)?.documents.len();
        inner.check_fields(fields)?;
        check_uploads(existing, &files)?;

        let added = inner.attach(id, files);
        let Some(record) = inner.tasks.get_mut(&id) else {
            return Err(StoreError::NotFound("Task not found"));
        };
        record.apply(fields);
        record.documents.extend(added);
        let Some(record) = inner.tasks.get(&id) else {
            return Err(StoreError::NotFound("Task not found"));
        };
        let task = inner.view(record);
        tracing::info!(task_id = %id, docs = task.documents.len(), "task updated");
        Ok(task)
    }

    /// Deletes a task together with its documents.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] or [`StoreError::Forbidden`].
    pub async fn delete_task(&self, viewer: &User, id: TaskId) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.task_for(viewer, id)?;
        inner.remove_task(id);
        tracing::info!(task_id = %id, "task deleted");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Documents
    // -----------------------------------------------------------------------

    /// Returns a document's metadata and content.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] or [`StoreError::Forbidden`].
    pub async fn document(
        &self,
        viewer: &User,
        id: DocumentId,
    ) -> Result<(Document, Vec<u8>), StoreError> {
        let inner = self.inner.read().await;
        let doc = inner.document_for(viewer, id)?;
        Ok((doc.meta.clone(), doc.content.clone()))
    }

    /// Detaches and deletes a document. The task itself is kept.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] or [`StoreError::Forbidden`].
    pub async fn delete_document(&self, viewer: &User, id: DocumentId) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let task_id = inner.document_for(viewer, id)?.meta.task_id;
        inner.documents.remove(&id);
        if let Some(task) = inner.tasks.get_mut(&task_id) {
            task.documents.retain(|d| *d != id);
        }
        tracing::info!(task_id = %task_id, document_id = %id, "document deleted");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Users (callers must have checked the admin role)
    // -----------------------------------------------------------------------

    /// Sorts and pages all users.
    pub async fn list_users(&self, query: &UserQuery) -> Page<User> {
        let inner = self.inner.read().await;
        let mut users: Vec<&UserRecord> = inner.users.values().collect();
        users.sort_by(|a, b| directed(compare_users(a, b, query.sort_by), query.sort_dir));
        let users: Vec<User> = users.into_iter().map(UserRecord::to_user).collect();
        Page::slice(&users, query.page, query.size)
    }

    /// Fetches one user.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`].
    pub async fn get_user(&self, id: UserId) -> Result<User, StoreError> {
        let inner = self.inner.read().await;
        inner
            .users
            .get(&id)
            .map(UserRecord::to_user)
            .ok_or(StoreError::NotFound("User not found"))
    }

    /// Creates a user.
    ///
    /// # Errors
    ///
    /// [`StoreError::BadRequest`] for blank credentials or a taken email.
    pub async fn create_user(&self, new_user: &NewUser) -> Result<User, StoreError> {
        let mut inner = self.inner.write().await;
        let user = inner.insert_user(&new_user.email, &new_user.password, new_user.role)?;
        tracing::info!(user_id = %user.id, role = %user.role, "user created");
        Ok(user)
    }

    /// Updates email and role, and the password only when a non-empty one
    /// is supplied.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`], or [`StoreError::BadRequest`] for a blank or
    /// taken email.
    pub async fn update_user(&self, id: UserId, update: &UserUpdate) -> Result<User, StoreError> {
        let mut inner = self.inner.write().await;
        if !inner.users.contains_key(&id) {
            return Err(StoreError::NotFound("User not found"));
        }
        let email = update.email.trim();
        if email.is_empty() {
            return Err(StoreError::bad_request("Email is required"));
        }
        if inner.email_taken(email, Some(id)) {
            return Err(StoreError::bad_request("Email already registered"));
        }
        let Some(record) = inner.users.get_mut(&id) else {
            return Err(StoreError::NotFound("User not found"));
        };
        record.email = email.to_string();
        record.role = update.role;
        let password_changed = match update.password.as_deref() {
            Some(password) if !password.is_empty() => {
                record.password = password.to_string();
                true
            }
            _ => false,
        };
        tracing::info!(user_id = %id, password_changed, "user updated");
        Ok(record.to_user())
    }

    /// Deletes a user, revokes their tokens, unassigns their tasks and
    /// removes the tasks they created.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`].
    pub async fn delete_user(&self, id: UserId) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if inner.users.remove(&id).is_none() {
            return Err(StoreError::NotFound("User not found"));
        }
        inner.tokens.retain(|_, user| *user != id);
        let owned: Vec<TaskId> = inner
            .tasks
            .values()
            .filter(|t| t.created_by == id)
            .map(|t| t.id)
            .collect();
        for task in owned {
            inner.remove_task(task);
        }
        for task in inner.tasks.values_mut() {
            if task.assigned_to == Some(id) {
                task.assigned_to = None;
            }
        }
        tracing::info!(user_id = %id, "user deleted");
        Ok(())
    }
}
