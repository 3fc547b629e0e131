//! Dashboard: the first page of tasks with the server's default ordering.

use std::sync::Arc;

use taskdesk_proto::query::TaskQuery;
use taskdesk_proto::task::{Task, TaskStatus};

use crate::api::TaskApi;
use crate::collection::CollectionState;
use crate::sync::{FetchOutcome, QuerySync};

/// Controller behind the dashboard. Owns its own collection, independent
/// of the task list view.
pub struct DashboardController<A> {
    api: Arc<A>,
    sync: QuerySync<TaskQuery, Task>,
}

impl<A: TaskApi> DashboardController<A> {
    /// Creates a dashboard showing `page_size` tasks.
    pub fn new(api: Arc<A>, page_size: u32) -> Self {
        Self {
            api,
            sync: QuerySync::new(TaskQuery::with_size(page_size)),
        }
    }

    /// Fetches the first page.
    pub async fn load(&self) -> FetchOutcome {
        let ticket = self.sync.begin_refresh();
        let result = self.api.list_tasks(ticket.query()).await;
        self.sync.finish(&ticket, result)
    }

    /// Snapshot of the dashboard collection.
    pub fn state(&self) -> CollectionState<Task> {
        self.sync.state()
    }

    /// Count of shown tasks per status, in workflow order.
    pub fn status_counts(&self) -> [(TaskStatus, usize); 3] {
        let state = self.sync.state();
        TaskStatus::ALL.map(|status| {
            let n = state.items().iter().filter(|t| t.status == status).count();
            (status, n)
        })
    }
}
