//! Assignee roster for task forms.
//!
//! Only administrators can reassign tasks, so only they load the roster.
//! For everyone else the roster is empty and no request is issued.

use taskdesk_proto::query::UserQuery;
use taskdesk_proto::user::{User, UserId};

use crate::api::{ApiError, TaskApi};
use crate::gate::can_manage_users;

/// Loads the first page of users as assignment candidates.
///
/// # Errors
///
/// Propagates the list failure for admins.
pub async fn load_assignees<A: TaskApi>(
    api: &A,
    viewer: &User,
    page_size: u32,
) -> Result<Vec<User>, ApiError> {
    if !can_manage_users(viewer) {
        return Ok(Vec::new());
    }
    let page = api.list_users(&UserQuery::with_size(page_size)).await?;
    tracing::debug!(count = page.content.len(), "assignee roster loaded");
    Ok(page.content)
}

/// Where an assignee id stands relative to a loaded roster page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssigneeCheck {
    /// The id is on the page.
    Listed,
    /// The page holds every user and the id is not among them.
    Unknown,
    /// The page is full, so the id may be on a later page. Only the server
    /// can tell.
    Unlisted,
}

/// Looks `id` up in a roster fetched with `page_size`.
#[must_use]
pub fn locate_assignee(roster: &[User], page_size: u32, id: UserId) -> AssigneeCheck {
    if roster.iter().any(|u| u.id == id) {
        AssigneeCheck::Listed
    } else if u32::try_from(roster.len()).is_ok_and(|n| n < page_size) {
        AssigneeCheck::Unknown
    } else {
        AssigneeCheck::Unlisted
    }
}
