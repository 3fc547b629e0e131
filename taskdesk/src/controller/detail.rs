//! Single-task view: load, edit, delete and document operations.
//!
//! ```text
//! Loading ──ok──▶ Loaded ◀──cancel/submit ok──▶ Editing
//!    │  ▲            │
//!    │  └─ error     └──delete ok──▶ Deleted
//!    └──not found──▶ NotFound
//! ```
//!
//! After every successful mutation the task is fetched again; local state
//! is never patched optimistically.

use std::path::PathBuf;
use std::sync::Arc;

use taskdesk_proto::task::{DocumentId, Task, TaskId, UploadFile};

use super::{Confirmation, ViewError};
use crate::api::{ApiError, TaskApi};
use crate::attachments::validate_attachments;
use crate::download::FileSink;
use crate::draft::TaskDraft;

/// Lifecycle of the detail view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailState {
    /// Waiting for the task. Holds the last retryable error, if any.
    Loading {
        /// Failure of the previous attempt.
        error: Option<ApiError>,
    },
    /// Task shown read-only.
    Loaded,
    /// Edit form open.
    Editing,
    /// Task deleted. Terminal.
    Deleted,
    /// Task does not exist (or is not visible). Terminal.
    NotFound,
}

impl DetailState {
    const fn name(&self) -> &'static str {
        match self {
            Self::Loading { .. } => "loading",
            Self::Loaded => "loaded",
            Self::Editing => "editing",
            Self::Deleted => "deleted",
            Self::NotFound => "not found",
        }
    }

    /// Returns true for `Deleted` and `NotFound`.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Deleted | Self::NotFound)
    }
}

/// Controller behind the task detail view.
pub struct TaskDetailController<A> {
    api: Arc<A>,
    id: TaskId,
    state: DetailState,
    task: Option<Task>,
    draft: Option<TaskDraft>,
    form_error: Option<ViewError>,
    alert: Option<ViewError>,
}

impl<A: TaskApi> TaskDetailController<A> {
    /// Creates a controller for task `id` in the `Loading` state.
    pub fn new(api: Arc<A>, id: TaskId) -> Self {
        Self {
            api,
            id,
            state: DetailState::Loading { error: None },
            task: None,
            draft: None,
            form_error: None,
            alert: None,
        }
    }

    /// Current state.
    pub const fn state(&self) -> &DetailState {
        &self.state
    }

    /// Identifier of the task this view is about.
    pub const fn task_id(&self) -> TaskId {
        self.id
    }

    /// Last fetched task.
    pub const fn task(&self) -> Option<&Task> {
        self.task.as_ref()
    }

    /// Current edit draft.
    pub const fn draft(&self) -> Option<&TaskDraft> {
        self.draft.as_ref()
    }

    /// Mutable access to the draft while editing.
    pub fn draft_mut(&mut self) -> Option<&mut TaskDraft> {
        if self.state == DetailState::Editing {
            self.draft.as_mut()
        } else {
            None
        }
    }

    /// Error shown inside the edit form.
    pub const fn form_error(&self) -> Option<&ViewError> {
        self.form_error.as_ref()
    }

    /// One-shot alert from the last failed action.
    pub const fn alert(&self) -> Option<&ViewError> {
        self.alert.as_ref()
    }

    /// Clears the alert once shown.
    pub fn dismiss_alert(&mut self) {
        self.alert = None;
    }

    fn invalid(&self, action: &'static str) -> ViewError {
        ViewError::InvalidState {
            action,
            state: self.state.name(),
        }
    }

    /// Fetches the task.
    ///
    /// Success moves to `Loaded` with a fresh draft; a 404 moves to the
    /// terminal `NotFound`; any other failure stays in `Loading` with the
    /// error recorded for a retry.
    ///
    /// # Errors
    ///
    /// The fetch failure, or [`ViewError::InvalidState`] in a terminal state.
    pub async fn load(&mut self) -> Result<&Task, ViewError> {
        if self.state.is_terminal() {
            return Err(self.invalid("load"));
        }
        self.state = DetailState::Loading { error: None };
        match self.api.get_task(self.id).await {
            Ok(task) => {
                tracing::debug!(task_id = %self.id, "task loaded");
                Ok(self.install(task))
            }
            Err(e) if e.is_not_found() => {
                tracing::warn!(task_id = %self.id, "task not found");
                self.state = DetailState::NotFound;
                self.task = None;
                self.draft = None;
                Err(e.into())
            }
            Err(e) => {
                tracing::warn!(task_id = %self.id, error = %e, "task load failed");
                self.state = DetailState::Loading {
                    error: Some(e.clone()),
                };
                Err(e.into())
            }
        }
    }

    fn install(&mut self, task: Task) -> &Task {
        self.draft = Some(TaskDraft::from_task(&task));
        self.state = DetailState::Loaded;
        self.form_error = None;
        self.task.insert(task)
    }

    /// Re-fetches after a mutation. A failure keeps the previous task and
    /// raises an alert; a 404 means the task vanished.
    async fn reload_after_mutation(&mut self) {
        match self.api.get_task(self.id).await {
            Ok(task) => {
                self.install(task);
            }
            Err(e) if e.is_not_found() => {
                self.state = DetailState::NotFound;
                self.task = None;
                self.draft = None;
            }
            Err(e) => {
                tracing::warn!(task_id = %self.id, error = %e, "re-fetch failed");
                self.alert = Some(e.into());
            }
        }
    }

    /// Opens the edit form with a draft seeded from the task.
    ///
    /// # Errors
    ///
    /// [`ViewError::InvalidState`] unless `Loaded`.
    pub fn begin_edit(&mut self) -> Result<&mut TaskDraft, ViewError> {
        if self.state != DetailState::Loaded {
            return Err(self.invalid("edit"));
        }
        let Some(task) = self.task.as_ref() else {
            return Err(self.invalid("edit"));
        };
        self.state = DetailState::Editing;
        self.form_error = None;
        Ok(self.draft.insert(TaskDraft::from_task(task)))
    }

    /// Closes the edit form and discards the draft.
    pub fn cancel_edit(&mut self) {
        if self.state == DetailState::Editing {
            self.state = DetailState::Loaded;
            self.form_error = None;
            self.draft = self.task.as_ref().map(TaskDraft::from_task);
        }
    }

    /// Submits the edit form with newly selected files.
    ///
    /// Files are checked against the task's current document count first;
    /// a failed check stays in `Editing` and sends nothing. A server
    /// rejection also stays in `Editing` with the message as form error.
    /// Once the update is accepted the view returns to `Loaded`, even if
    /// the follow-up fetch fails (that failure is raised as an alert).
    ///
    /// # Errors
    ///
    /// [`ViewError::Validation`], [`ViewError::Api`], or
    /// [`ViewError::InvalidState`] unless `Editing`.
    pub async fn submit_edit(
        &mut self,
        draft: TaskDraft,
        files: Vec<UploadFile>,
    ) -> Result<(), ViewError> {
        if self.state != DetailState::Editing {
            return Err(self.invalid("submit"));
        }
        let existing = self.task.as_ref().map_or(0, |t| t.documents.len());
        self.form_error = None;

        let checked = draft
            .to_fields()
            .and_then(|fields| validate_attachments(existing, files).map(|files| (fields, files)));
        self.draft = Some(draft);
        let (fields, files) = match checked {
            Ok(ok) => ok,
            Err(e) => return Err(self.reject_form(e.into())),
        };

        if let Err(e) = self.api.update_task(self.id, &fields, &files).await {
            return Err(self.reject_form(e.into()));
        }
        tracing::info!(task_id = %self.id, files = files.len(), "task updated");
        // The submitted draft is spent even if the re-fetch below fails.
        self.state = DetailState::Loaded;
        self.draft = self.task.as_ref().map(TaskDraft::from_task);
        self.reload_after_mutation().await;
        Ok(())
    }

    fn reject_form(&mut self, error: ViewError) -> ViewError {
        tracing::warn!(task_id = %self.id, error = %error, "edit rejected");
        self.form_error = Some(error.clone());
        error
    }

    /// Deletes the task once confirmed.
    ///
    /// # Errors
    ///
    /// [`ViewError::Api`] (state stays `Loaded`, alert raised) or
    /// [`ViewError::InvalidState`] unless `Loaded`.
    pub async fn delete_task(&mut self, confirmation: Confirmation) -> Result<(), ViewError> {
        if self.state != DetailState::Loaded {
            return Err(self.invalid("delete"));
        }
        if !confirmation.is_confirmed() {
            return Ok(());
        }
        match self.api.delete_task(self.id).await {
            Ok(()) => {
                tracing::info!(task_id = %self.id, "task deleted");
                self.state = DetailState::Deleted;
                self.task = None;
                self.draft = None;
                Ok(())
            }
            Err(e) => Err(self.raise(e.into())),
        }
    }

    /// Deletes one attached document once confirmed, then re-fetches.
    ///
    /// # Errors
    ///
    /// [`ViewError::UnknownDocument`] if the document is not attached,
    /// [`ViewError::Api`] with an alert and unchanged state on failure.
    pub async fn delete_document(
        &mut self,
        document: DocumentId,
        confirmation: Confirmation,
    ) -> Result<(), ViewError> {
        if !matches!(self.state, DetailState::Loaded | DetailState::Editing) {
            return Err(self.invalid("delete a document"));
        }
        if self.task.as_ref().and_then(|t| t.document(document)).is_none() {
            return Err(self.raise(ViewError::UnknownDocument(document)));
        }
        if !confirmation.is_confirmed() {
            return Ok(());
        }
        match self.api.delete_document(document).await {
            Ok(()) => {
                tracing::info!(task_id = %self.id, document_id = %document, "document deleted");
                let editing = self.state == DetailState::Editing;
                let draft = self.draft.clone();
                self.reload_after_mutation().await;
                // An open edit form keeps its unsaved draft.
                if editing && self.state == DetailState::Loaded {
                    self.state = DetailState::Editing;
                    self.draft = draft;
                }
                Ok(())
            }
            Err(e) => Err(self.raise(e.into())),
        }
    }

    /// Downloads a document and hands it to `sink` under its file name.
    /// Task state is never modified.
    ///
    /// # Errors
    ///
    /// [`ViewError::UnknownDocument`], [`ViewError::Api`] or
    /// [`ViewError::Download`]; each also raises an alert.
    pub async fn download_document<S: FileSink>(
        &mut self,
        document: DocumentId,
        sink: &S,
    ) -> Result<PathBuf, ViewError> {
        let Some(file_name) = self
            .task
            .as_ref()
            .and_then(|t| t.document(document))
            .map(|d| d.file_name.clone())
        else {
            return Err(self.raise(ViewError::UnknownDocument(document)));
        };
        let content = match self.api.download_document(document).await {
            Ok(content) => content,
            Err(e) => return Err(self.raise(e.into())),
        };
        sink.save(&file_name, &content)
            .map_err(|e| self.raise(e.into()))
    }

    fn raise(&mut self, error: ViewError) -> ViewError {
        tracing::warn!(task_id = %self.id, error = %error, "action failed");
        self.alert = Some(error.clone());
        error
    }
}
