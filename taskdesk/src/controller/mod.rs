//! View controllers.
//!
//! Each controller owns the state one view renders and is generic over
//! [`TaskApi`](crate::api::TaskApi) so tests can drive it with the loopback
//! API. List controllers take `&self` and tolerate overlapping fetches
//! (last request wins, see [`crate::sync`]); the detail controller is a
//! single-threaded state machine and takes `&mut self`.

pub mod dashboard;
pub mod detail;
pub mod tasks;
pub mod users;

pub use dashboard::DashboardController;
pub use detail::{DetailState, TaskDetailController};
pub use tasks::TaskListController;
pub use users::UserAdminController;

use taskdesk_proto::task::DocumentId;

use crate::api::ApiError;
use crate::attachments::ValidationError;
use crate::download::DownloadError;
use crate::gate::AccessError;

/// Anything a view can show as a form error or alert.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ViewError {
    /// A pre-submission check failed; nothing was sent.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The server or transport failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The role gate refused the action; nothing was sent.
    #[error(transparent)]
    Access(#[from] AccessError),

    /// Saving a downloaded document failed.
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// The action is not valid in the controller's current state.
    #[error("cannot {action} while {state}")]
    InvalidState {
        /// Attempted action.
        action: &'static str,
        /// Current state name.
        state: &'static str,
    },

    /// The document is not attached to the loaded task.
    #[error("document {0} is not attached to this task")]
    UnknownDocument(DocumentId),

    /// An administrator tried to delete or demote their own account.
    #[error("you cannot {0} your own account")]
    SelfManagement(&'static str),
}

impl ViewError {
    /// Text for an inline error or alert.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}

/// Answer to a "are you sure?" prompt guarding a destructive action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    /// Proceed.
    Confirmed,
    /// Do nothing.
    Declined,
}

impl Confirmation {
    /// Maps a yes/no flag (e.g. `--yes`) onto a confirmation.
    #[must_use]
    pub const fn from_flag(yes: bool) -> Self {
        if yes { Self::Confirmed } else { Self::Declined }
    }

    /// Returns true for [`Confirmation::Confirmed`].
    #[must_use]
    pub const fn is_confirmed(self) -> bool {
        matches!(self, Self::Confirmed)
    }
}
