//! Subcommands of the `taskdesk` binary and the glue that turns their
//! arguments into queries, drafts and uploads.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use taskdesk_proto::query::{SortDirection, TaskQuery, TaskSortField, UserQuery, UserSortField};
use taskdesk_proto::task::{PDF_MEDIA_TYPE, TaskPriority, TaskStatus, UploadFile};
use taskdesk_proto::user::{Role, UserId};

use crate::draft::{TaskDraft, UserDraft};

/// Top-level subcommands.
#[derive(clap::Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Create an account and sign in with it.
    Register {
        /// Requested role (`USER` or `ADMIN`).
        #[arg(long)]
        role: Option<Role>,
    },
    /// Show the first page of tasks with per-status counts.
    Dashboard,
    /// Browse and edit tasks.
    #[command(subcommand)]
    Tasks(TaskCommand),
    /// Work with documents attached to a task.
    #[command(subcommand)]
    Docs(DocCommand),
    /// Manage users (administrators only).
    #[command(subcommand)]
    Users(UserCommand),
}

/// `tasks` subcommands.
#[derive(clap::Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum TaskCommand {
    /// List one page of tasks.
    List(TaskListArgs),
    /// Show a task with its documents.
    Show {
        /// Task id.
        id: i64,
    },
    /// Create a task.
    Create(TaskFormArgs),
    /// Edit a task; omitted fields keep their current value.
    Edit {
        /// Task id.
        id: i64,
        #[command(flatten)]
        form: TaskFormArgs,
    },
    /// Delete a task.
    Delete {
        /// Task id.
        id: i64,
        /// Confirm the deletion.
        #[arg(long)]
        yes: bool,
    },
}

/// `docs` subcommands.
#[derive(clap::Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum DocCommand {
    /// Save a document into the download directory.
    Download {
        /// Owning task id.
        task: i64,
        /// Document id.
        document: i64,
    },
    /// Remove a document from its task.
    Delete {
        /// Owning task id.
        task: i64,
        /// Document id.
        document: i64,
        /// Confirm the deletion.
        #[arg(long)]
        yes: bool,
    },
}

/// `users` subcommands.
#[derive(clap::Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum UserCommand {
    /// List one page of users.
    List(UserListArgs),
    /// Create a user.
    Create {
        /// Email address.
        #[arg(long = "user-email")]
        email: String,
        /// Initial password.
        #[arg(long = "user-password")]
        password: String,
        /// Role (`USER` or `ADMIN`).
        #[arg(long, default_value = "USER")]
        role: Role,
    },
    /// Update a user; a blank or missing password keeps the current one.
    Update {
        /// User id.
        id: i64,
        /// Email address.
        #[arg(long = "user-email")]
        email: String,
        /// New password.
        #[arg(long = "user-password")]
        password: Option<String>,
        /// Role (`USER` or `ADMIN`).
        #[arg(long)]
        role: Role,
    },
    /// Delete a user.
    Delete {
        /// User id.
        id: i64,
        /// Confirm the deletion.
        #[arg(long)]
        yes: bool,
    },
}

/// Filters, sort and page for `tasks list`.
#[derive(clap::Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskListArgs {
    /// Only tasks with this status (`TODO`, `IN_PROGRESS`, `DONE`).
    #[arg(long)]
    pub status: Option<TaskStatus>,
    /// Only tasks with this priority (`LOW`, `MEDIUM`, `HIGH`).
    #[arg(long)]
    pub priority: Option<TaskPriority>,
    /// Only tasks due on this date (`YYYY-MM-DD`).
    #[arg(long)]
    pub due_date: Option<NaiveDate>,
    /// Zero-based page number.
    #[arg(long, default_value_t = 0)]
    pub page: u32,
    /// Page size; defaults to the configured task page size.
    #[arg(long)]
    pub size: Option<u32>,
    /// Sort field (`id`, `title`, `status`, `priority`, `dueDate`).
    #[arg(long)]
    pub sort_by: Option<TaskSortField>,
    /// Sort direction (`asc`, `desc`).
    #[arg(long)]
    pub sort_dir: Option<SortDirection>,
}

impl TaskListArgs {
    /// Builds the list descriptor, falling back to `default_size`.
    #[must_use]
    pub fn to_query(&self, default_size: u32) -> TaskQuery {
        let mut query = TaskQuery::with_size(self.size.unwrap_or(default_size));
        query.status = self.status;
        query.priority = self.priority;
        query.due_date = self.due_date;
        query.page = self.page;
        if let Some(sort_by) = self.sort_by {
            query.sort_by = sort_by;
        }
        if let Some(sort_dir) = self.sort_dir {
            query.sort_dir = sort_dir;
        }
        query
    }
}

/// Sort and page for `users list`.
#[derive(clap::Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct UserListArgs {
    /// Zero-based page number.
    #[arg(long, default_value_t = 0)]
    pub page: u32,
    /// Sort field (`id`, `email`, `role`).
    #[arg(long)]
    pub sort_by: Option<UserSortField>,
    /// Sort direction (`asc`, `desc`).
    #[arg(long)]
    pub sort_dir: Option<SortDirection>,
}

impl UserListArgs {
    /// Builds the roster descriptor for pages of `size`.
    #[must_use]
    pub fn to_query(&self, size: u32) -> UserQuery {
        let mut query = UserQuery::with_size(size);
        query.page = self.page;
        if let Some(sort_by) = self.sort_by {
            query.sort_by = sort_by;
        }
        if let Some(sort_dir) = self.sort_dir {
            query.sort_dir = sort_dir;
        }
        query
    }
}

/// Task form fields shared by `tasks create` and `tasks edit`.
#[derive(clap::Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFormArgs {
    /// Title.
    #[arg(long)]
    pub title: Option<String>,
    /// Description.
    #[arg(long)]
    pub description: Option<String>,
    /// Status.
    #[arg(long)]
    pub status: Option<TaskStatus>,
    /// Priority.
    #[arg(long)]
    pub priority: Option<TaskPriority>,
    /// Due date (`YYYY-MM-DD`).
    #[arg(long)]
    pub due_date: Option<NaiveDate>,
    /// Assignee user id.
    #[arg(long, conflicts_with = "unassign")]
    pub assignee: Option<i64>,
    /// Clear the assignee.
    #[arg(long)]
    pub unassign: bool,
    /// PDF files to attach (repeatable).
    #[arg(long = "file")]
    pub files: Vec<PathBuf>,
}

impl TaskFormArgs {
    /// Overwrites the draft fields that were given on the command line.
    pub fn apply_to(&self, draft: &mut TaskDraft) {
        if let Some(title) = &self.title {
            draft.title.clone_from(title);
        }
        if let Some(description) = &self.description {
            draft.description.clone_from(description);
        }
        if let Some(status) = self.status {
            draft.status = status;
        }
        if let Some(priority) = self.priority {
            draft.priority = priority;
        }
        if self.due_date.is_some() {
            draft.due_date = self.due_date;
        }
        if let Some(assignee) = self.assignee {
            draft.assigned_to_id = Some(UserId::new(assignee));
        } else if self.unassign {
            draft.assigned_to_id = None;
        }
    }
}

/// Builds a user draft from `users create` / `users update` arguments.
#[must_use]
pub fn user_draft(email: &str, password: Option<&str>, role: Role) -> UserDraft {
    UserDraft {
        email: email.to_string(),
        password: password.unwrap_or_default().to_string(),
        role,
    }
}

/// Media type declared for a local file, judged by its extension.
#[must_use]
pub fn media_type_for(path: &Path) -> &'static str {
    let is_pdf = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
    if is_pdf {
        PDF_MEDIA_TYPE
    } else {
        "application/octet-stream"
    }
}

/// Reads local files into upload candidates. Type checks happen later,
/// in the attachment validator.
///
/// # Errors
///
/// Returns the first I/O error, annotated with the offending path.
pub async fn read_uploads(paths: &[PathBuf]) -> Result<Vec<UploadFile>, std::io::Error> {
    let mut uploads = Vec::with_capacity(paths.len());
    for path in paths {
        let content = tokio::fs::read(path).await.map_err(|e| {
            std::io::Error::new(e.kind(), format!("{}: {e}", path.display()))
        })?;
        let file_name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        uploads.push(UploadFile::new(file_name, media_type_for(path), content));
    }
    Ok(uploads)
}
