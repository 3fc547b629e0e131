//! Task list view: filters, sort, pagination and task creation.

use std::sync::Arc;

use parking_lot::Mutex;
use taskdesk_proto::query::{PageQuery, TaskQuery, TaskQueryPatch};
use taskdesk_proto::task::{Task, UploadFile};

use super::ViewError;
use crate::api::TaskApi;
use crate::attachments::validate_attachments;
use crate::collection::CollectionState;
use crate::draft::TaskDraft;
use crate::sync::{FetchOutcome, FetchTicket, QuerySync};

/// Controller behind the task list.
///
/// Every descriptor change dispatches exactly one fetch. Fetches may
/// overlap; only the response for the latest descriptor is applied.
pub struct TaskListController<A> {
    api: Arc<A>,
    sync: QuerySync<TaskQuery, Task>,
    form_error: Mutex<Option<ViewError>>,
}

impl<A: TaskApi> TaskListController<A> {
    /// Creates a controller with the default descriptor and `page_size`.
    pub fn new(api: Arc<A>, page_size: u32) -> Self {
        Self::with_query(api, TaskQuery::with_size(page_size))
    }

    /// Creates a controller starting from an explicit descriptor.
    pub fn with_query(api: Arc<A>, query: TaskQuery) -> Self {
        Self {
            api,
            sync: QuerySync::new(query),
            form_error: Mutex::new(None),
        }
    }

    /// Current descriptor.
    pub fn query(&self) -> TaskQuery {
        self.sync.query()
    }

    /// Snapshot of the list state.
    pub fn state(&self) -> CollectionState<Task> {
        self.sync.state()
    }

    /// Error shown in the create form, if the last attempt failed.
    pub fn form_error(&self) -> Option<ViewError> {
        self.form_error.lock().clone()
    }

    /// Merges a filter or sort change. Changing anything but the page
    /// resets to page 0. A patch that changes nothing fetches nothing.
    pub async fn set_filter(&self, patch: &TaskQueryPatch) -> FetchOutcome {
        match self.sync.begin_with(|q| q.apply(patch)) {
            Some(ticket) => self.fetch(ticket).await,
            None => FetchOutcome::Skipped,
        }
    }

    /// Moves to `page`, keeping filters and sort.
    pub async fn set_page(&self, page: u32) -> FetchOutcome {
        let ticket = self.sync.begin_with(|q| {
            q.set_page(page);
            true
        });
        match ticket {
            Some(ticket) => self.fetch(ticket).await,
            None => FetchOutcome::Skipped,
        }
    }

    /// Re-fetches the current descriptor.
    pub async fn refresh(&self) -> FetchOutcome {
        let ticket = self.sync.begin_refresh();
        self.fetch(ticket).await
    }

    async fn fetch(&self, ticket: FetchTicket<TaskQuery>) -> FetchOutcome {
        let result = self.api.list_tasks(ticket.query()).await;
        self.sync.finish(&ticket, result)
    }

    /// Creates a task from the form and refreshes the current page.
    ///
    /// Title and due date are required and at most three PDFs may be
    /// attached. A failed check sets the form error and sends nothing.
    ///
    /// # Errors
    ///
    /// [`ViewError::Validation`] for a failed pre-check,
    /// [`ViewError::Api`] if the server rejects the creation.
    pub async fn create_task(
        &self,
        draft: &TaskDraft,
        files: Vec<UploadFile>,
    ) -> Result<Task, ViewError> {
        *self.form_error.lock() = None;

        let checked = draft
            .to_fields()
            .and_then(|fields| validate_attachments(0, files).map(|files| (fields, files)));
        let (fields, files) = match checked {
            Ok(ok) => ok,
            Err(e) => return Err(self.fail_form(e.into())),
        };

        let task = match self.api.create_task(&fields, &files).await {
            Ok(task) => task,
            Err(e) => return Err(self.fail_form(e.into())),
        };
        tracing::info!(task_id = %task.id, files = files.len(), "task created");

        let _ = self.refresh().await;
        Ok(task)
    }

    fn fail_form(&self, error: ViewError) -> ViewError {
        tracing::warn!(error = %error, "create task rejected");
        *self.form_error.lock() = Some(error.clone());
        error
    }
}
