//! Query descriptors for the paginated list endpoints.
//!
//! A descriptor fully determines one list request. Changes arrive as
//! patches; [`TaskQuery::apply`] and [`UserQuery::apply`] merge a patch and
//! reset the page index to 0 whenever anything other than the page moves,
//! because a page number only has meaning relative to its own filter set.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::task::{TaskPriority, TaskStatus, UnknownVariant};

/// Default page size for both collections.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending.
    #[default]
    Asc,
    /// Descending.
    Desc,
}

impl SortDirection {
    /// Wire representation (`asc`, `desc`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortDirection {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("asc") {
            Ok(Self::Asc)
        } else if s.eq_ignore_ascii_case("desc") {
            Ok(Self::Desc)
        } else {
            Err(UnknownVariant::new("sort direction", s))
        }
    }
}

/// Fields the task list can be sorted by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskSortField {
    /// Creation order.
    #[default]
    Id,
    /// Title, lexicographic.
    Title,
    /// Status, in workflow order.
    Status,
    /// Priority, in urgency order.
    Priority,
    /// Due date.
    DueDate,
}

impl TaskSortField {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Title => "title",
            Self::Status => "status",
            Self::Priority => "priority",
            Self::DueDate => "dueDate",
        }
    }
}

impl FromStr for TaskSortField {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "id" => Ok(Self::Id),
            "title" => Ok(Self::Title),
            "status" => Ok(Self::Status),
            "priority" => Ok(Self::Priority),
            "dueDate" => Ok(Self::DueDate),
            other => Err(UnknownVariant::new("task sort field", other)),
        }
    }
}

/// Fields the user roster can be sorted by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UserSortField {
    /// Creation order.
    #[default]
    Id,
    /// Email, lexicographic.
    Email,
    /// Role.
    Role,
}

impl UserSortField {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Email => "email",
            Self::Role => "role",
        }
    }
}

impl FromStr for UserSortField {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "id" => Ok(Self::Id),
            "email" => Ok(Self::Email),
            "role" => Ok(Self::Role),
            other => Err(UnknownVariant::new("user sort field", other)),
        }
    }
}

/// Behaviour shared by every list descriptor.
pub trait PageQuery: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// Zero-based page index.
    fn page(&self) -> u32;

    /// Replaces the page index without touching any other field.
    fn set_page(&mut self, page: u32);

    /// Query-string pairs for the list request. Absent filters are omitted.
    fn query_pairs(&self) -> Vec<(&'static str, String)>;
}

/// Descriptor for the task list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskQuery {
    /// Only tasks with this status.
    pub status: Option<TaskStatus>,
    /// Only tasks with this priority.
    pub priority: Option<TaskPriority>,
    /// Only tasks due on this date.
    pub due_date: Option<NaiveDate>,
    /// Zero-based page index.
    pub page: u32,
    /// Page size.
    pub size: u32,
    /// Sort field.
    pub sort_by: TaskSortField,
    /// Sort direction.
    pub sort_dir: SortDirection,
}

impl Default for TaskQuery {
    fn default() -> Self {
        Self {
            status: None,
            priority: None,
            due_date: None,
            page: 0,
            size: DEFAULT_PAGE_SIZE,
            sort_by: TaskSortField::Id,
            sort_dir: SortDirection::Desc,
        }
    }
}

impl TaskQuery {
    /// Default descriptor with a custom page size.
    #[must_use]
    pub fn with_size(size: u32) -> Self {
        Self {
            size,
            ..Self::default()
        }
    }

    /// Merges a patch into this descriptor.
    ///
    /// If any field other than `page` changes, `page` is forced to 0 even
    /// when the patch also names a page. Returns true if the descriptor
    /// changed at all.
    pub fn apply(&mut self, patch: &TaskQueryPatch) -> bool {
        let before = self.clone();

        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = due_date;
        }
        if let Some(size) = patch.size {
            self.size = size;
        }
        if let Some(sort_by) = patch.sort_by {
            self.sort_by = sort_by;
        }
        if let Some(sort_dir) = patch.sort_dir {
            self.sort_dir = sort_dir;
        }

        let filters_moved = self.status != before.status
            || self.priority != before.priority
            || self.due_date != before.due_date
            || self.size != before.size
            || self.sort_by != before.sort_by
            || self.sort_dir != before.sort_dir;

        if filters_moved {
            self.page = 0;
        } else if let Some(page) = patch.page {
            self.page = page;
        }

        *self != before
    }
}

impl PageQuery for TaskQuery {
    fn page(&self) -> u32 {
        self.page
    }

    fn set_page(&mut self, page: u32) {
        self.page = page;
    }

    fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(7);
        if let Some(status) = self.status {
            pairs.push(("status", status.as_str().to_string()));
        }
        if let Some(priority) = self.priority {
            pairs.push(("priority", priority.as_str().to_string()));
        }
        if let Some(due_date) = self.due_date {
            pairs.push(("dueDate", due_date.format("%Y-%m-%d").to_string()));
        }
        pairs.push(("page", self.page.to_string()));
        pairs.push(("size", self.size.to_string()));
        pairs.push(("sortBy", self.sort_by.as_str().to_string()));
        pairs.push(("sortDir", self.sort_dir.as_str().to_string()));
        pairs
    }
}

/// Partial change to a [`TaskQuery`].
///
/// Filter fields are doubly optional: `None` leaves the filter alone,
/// `Some(None)` clears it, `Some(Some(v))` sets it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskQueryPatch {
    /// Status filter change.
    pub status: Option<Option<TaskStatus>>,
    /// Priority filter change.
    pub priority: Option<Option<TaskPriority>>,
    /// Due-date filter change.
    pub due_date: Option<Option<NaiveDate>>,
    /// Page change (ignored when any other field moves).
    pub page: Option<u32>,
    /// Page size change.
    pub size: Option<u32>,
    /// Sort field change.
    pub sort_by: Option<TaskSortField>,
    /// Sort direction change.
    pub sort_dir: Option<SortDirection>,
}

impl TaskQueryPatch {
    /// Sets or clears the status filter.
    #[must_use]
    pub const fn status(mut self, status: Option<TaskStatus>) -> Self {
        self.status = Some(status);
        self
    }

    /// Sets or clears the priority filter.
    #[must_use]
    pub const fn priority(mut self, priority: Option<TaskPriority>) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Sets or clears the due-date filter.
    #[must_use]
    pub const fn due_date(mut self, due_date: Option<NaiveDate>) -> Self {
        self.due_date = Some(due_date);
        self
    }

    /// Requests a page.
    #[must_use]
    pub const fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    /// Changes the page size.
    #[must_use]
    pub const fn size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    /// Changes the sort.
    #[must_use]
    pub const fn sort(mut self, sort_by: TaskSortField, sort_dir: SortDirection) -> Self {
        self.sort_by = Some(sort_by);
        self.sort_dir = Some(sort_dir);
        self
    }
}

/// Descriptor for the user roster: pagination and sort only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserQuery {
    /// Zero-based page index.
    pub page: u32,
    /// Page size.
    pub size: u32,
    /// Sort field.
    pub sort_by: UserSortField,
    /// Sort direction.
    pub sort_dir: SortDirection,
}

impl Default for UserQuery {
    fn default() -> Self {
        Self {
            page: 0,
            size: DEFAULT_PAGE_SIZE,
            sort_by: UserSortField::Id,
            sort_dir: SortDirection::Asc,
        }
    }
}

impl UserQuery {
    /// Default descriptor with a custom page size.
    #[must_use]
    pub fn with_size(size: u32) -> Self {
        Self {
            size,
            ..Self::default()
        }
    }

    /// Merges a patch; same page-reset rule as [`TaskQuery::apply`].
    pub fn apply(&mut self, patch: &UserQueryPatch) -> bool {
        let before = self.clone();

        if let Some(size) = patch.size {
            self.size = size;
        }
        if let Some(sort_by) = patch.sort_by {
            self.sort_by = sort_by;
        }
        if let Some(sort_dir) = patch.sort_dir {
            self.sort_dir = sort_dir;
        }

        if *self == before {
            if let Some(page) = patch.page {
                self.page = page;
            }
        } else {
            self.page = 0;
        }

        *self != before
    }
}

impl PageQuery for UserQuery {
    fn page(&self) -> u32 {
        self.page
    }

    fn set_page(&mut self, page: u32) {
        self.page = page;
    }

    fn query_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("page", self.page.to_string()),
            ("size", self.size.to_string()),
            ("sortBy", self.sort_by.as_str().to_string()),
            ("sortDir", self.sort_dir.as_str().to_string()),
        ]
    }
}

/// Partial change to a [`UserQuery`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserQueryPatch {
    /// Page change (ignored when any other field moves).
    pub page: Option<u32>,
    /// Page size change.
    pub size: Option<u32>,
    /// Sort field change.
    pub sort_by: Option<UserSortField>,
    /// Sort direction change.
    pub sort_dir: Option<SortDirection>,
}

impl UserQueryPatch {
    /// Requests a page.
    #[must_use]
    pub const fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    /// Changes the sort.
    #[must_use]
    pub const fn sort(mut self, sort_by: UserSortField, sort_dir: SortDirection) -> Self {
        self.sort_by = Some(sort_by);
        self.sort_dir = Some(sort_dir);
        self
    }
}
