//! Edit drafts: mutable form copies seeded from fetched entities.
//!
//! A draft is never written back into the entity it was seeded from. It is
//! converted into a request body on submit and discarded afterwards.

use chrono::NaiveDate;
use taskdesk_proto::task::{Task, TaskFields, TaskPriority, TaskStatus};
use taskdesk_proto::user::{NewUser, Role, User, UserId, UserUpdate};

use crate::attachments::ValidationError;

/// Editable task form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    /// Title.
    pub title: String,
    /// Description.
    pub description: String,
    /// Status.
    pub status: TaskStatus,
    /// Priority.
    pub priority: TaskPriority,
    /// Due date; `None` until picked.
    pub due_date: Option<NaiveDate>,
    /// Assignee.
    pub assigned_to_id: Option<UserId>,
}

impl Default for TaskDraft {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            status: TaskStatus::Todo,
            priority: TaskPriority::Medium,
            due_date: None,
            assigned_to_id: None,
        }
    }
}

impl TaskDraft {
    /// Seeds a draft from a fetched task.
    #[must_use]
    pub fn from_task(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            description: task.description.clone(),
            status: task.status,
            priority: task.priority,
            due_date: Some(task.due_date),
            assigned_to_id: task.assigned_to_id,
        }
    }

    /// Converts the draft into mutation fields.
    ///
    /// # Errors
    ///
    /// [`ValidationError::MissingField`] if the title is blank or no due
    /// date is set.
    pub fn to_fields(&self) -> Result<TaskFields, ValidationError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(ValidationError::MissingField("title"));
        }
        let due_date = self.due_date.ok_or(ValidationError::MissingField("dueDate"))?;
        Ok(TaskFields {
            title: title.to_string(),
            description: self.description.clone(),
            status: self.status,
            priority: self.priority,
            due_date,
            assigned_to_id: self.assigned_to_id,
        })
    }
}

/// Editable user form. The password is always blank when seeded.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct UserDraft {
    /// Email.
    pub email: String,
    /// Password; blank means "unchanged" on update.
    pub password: String,
    /// Role.
    pub role: Role,
}

impl std::fmt::Debug for UserDraft {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserDraft")
            .field("email", &self.email)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

impl UserDraft {
    /// Seeds an edit form from an existing user.
    #[must_use]
    pub fn from_user(user: &User) -> Self {
        Self {
            email: user.email.clone(),
            password: String::new(),
            role: user.role,
        }
    }

    /// Body for creating a user. Email and password are both required.
    ///
    /// # Errors
    ///
    /// [`ValidationError::MissingField`] naming the first blank field.
    pub fn to_new_user(&self) -> Result<NewUser, ValidationError> {
        let email = self.email.trim();
        if email.is_empty() {
            return Err(ValidationError::MissingField("email"));
        }
        if self.password.is_empty() {
            return Err(ValidationError::MissingField("password"));
        }
        Ok(NewUser {
            email: email.to_string(),
            password: self.password.clone(),
            role: self.role,
        })
    }

    /// Body for updating a user. A blank password is omitted.
    ///
    /// # Errors
    ///
    /// [`ValidationError::MissingField`] if the email is blank.
    pub fn to_update(&self) -> Result<UserUpdate, ValidationError> {
        let email = self.email.trim();
        if email.is_empty() {
            return Err(ValidationError::MissingField("email"));
        }
        Ok(UserUpdate::from_form(email, &self.password, self.role))
    }
}
