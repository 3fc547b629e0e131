//! Task and document types.
//!
//! A [`Task`] owns at most [`MAX_TASK_DOCUMENTS`] PDF [`Document`]s. The
//! limit is checked when a task body is decoded, so a task value held by
//! the client never violates it.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::user::UserId;

/// Maximum number of documents a single task may carry.
pub const MAX_TASK_DOCUMENTS: usize = 3;

/// The only media type accepted for task documents.
pub const PDF_MEDIA_TYPE: &str = "application/pdf";

/// Error returned when a string does not name a known enum variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value: {value:?}")]
pub struct UnknownVariant {
    /// Which enumeration was being parsed (e.g. `"status"`).
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

impl UnknownVariant {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Server-assigned task identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(i64);

impl TaskId {
    /// Wraps a raw identifier.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw identifier.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Server-assigned document identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(i64);

impl DocumentId {
    /// Wraps a raw identifier.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw identifier.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Workflow status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// Not started.
    Todo,
    /// Actively being worked on.
    InProgress,
    /// Finished.
    Done,
}

impl TaskStatus {
    /// All variants in display order.
    pub const ALL: [Self; 3] = [Self::Todo, Self::InProgress, Self::Done];

    /// Wire representation (`TODO`, `IN_PROGRESS`, `DONE`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "TODO",
            Self::InProgress => "IN_PROGRESS",
            Self::Done => "DONE",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("status", s))
    }
}

/// Priority of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskPriority {
    /// Can wait.
    Low,
    /// Normal.
    Medium,
    /// Urgent.
    High,
}

impl TaskPriority {
    /// All variants in ascending order of urgency.
    pub const ALL: [Self; 3] = [Self::Low, Self::Medium, Self::High];

    /// Wire representation (`LOW`, `MEDIUM`, `HIGH`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskPriority {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("priority", s))
    }
}

/// Metadata of a PDF attached to a task.
///
/// The binary content is addressed by [`Document::id`] and fetched on
/// demand; it is never part of this value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Document identifier.
    pub id: DocumentId,
    /// Task that owns this document.
    pub task_id: TaskId,
    /// Original file name, used when saving a download.
    pub file_name: String,
    /// Declared media type (always [`PDF_MEDIA_TYPE`] for stored documents).
    pub file_type: String,
    /// Size of the content in bytes.
    pub file_size: u64,
}

impl Document {
    /// Returns true if the declared media type is PDF.
    #[must_use]
    pub fn is_pdf(&self) -> bool {
        self.file_type == PDF_MEDIA_TYPE
    }
}

/// A task as returned by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Task identifier.
    pub id: TaskId,
    /// Short title.
    pub title: String,
    /// Free-form description (may be empty).
    #[serde(default, deserialize_with = "nullable_string")]
    pub description: String,
    /// Workflow status.
    pub status: TaskStatus,
    /// Priority.
    pub priority: TaskPriority,
    /// Calendar due date.
    pub due_date: NaiveDate,
    /// Assigned user, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to_id: Option<UserId>,
    /// Email of the assigned user, resolved by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to_email: Option<String>,
    /// Identifier of the creator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by_id: Option<UserId>,
    /// Email of the creator (read-only).
    #[serde(default, deserialize_with = "nullable_string")]
    pub created_by_email: String,
    /// Attached documents, in server order.
    #[serde(default, deserialize_with = "documents_within_limit")]
    pub documents: Vec<Document>,
}

impl Task {
    /// Number of additional documents this task can still accept.
    #[must_use]
    pub fn remaining_document_slots(&self) -> usize {
        MAX_TASK_DOCUMENTS.saturating_sub(self.documents.len())
    }

    /// Looks up an attached document by id.
    #[must_use]
    pub fn document(&self, id: DocumentId) -> Option<&Document> {
        self.documents.iter().find(|d| d.id == id)
    }
}

fn nullable_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn documents_within_limit<'de, D>(deserializer: D) -> Result<Vec<Document>, D::Error>
where
    D: Deserializer<'de>,
{
    let documents = Vec::<Document>::deserialize(deserializer)?;
    if documents.len() > MAX_TASK_DOCUMENTS {
        return Err(serde::de::Error::custom(format!(
            "task carries {} documents (max {MAX_TASK_DOCUMENTS})",
            documents.len()
        )));
    }
    Ok(documents)
}

/// Scalar fields sent with a create or update mutation.
///
/// Travels as the text parts of a multipart body alongside zero to three
/// file parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskFields {
    /// Task title (required, non-empty).
    pub title: String,
    /// Description (may be empty).
    pub description: String,
    /// Workflow status.
    pub status: TaskStatus,
    /// Priority.
    pub priority: TaskPriority,
    /// Due date (required).
    pub due_date: NaiveDate,
    /// Assignee; omitted from the body when `None`.
    pub assigned_to_id: Option<UserId>,
}

impl TaskFields {
    /// Text parts of the multipart body, in wire order.
    ///
    /// `assignedToId` is omitted entirely when no assignee is set.
    #[must_use]
    pub fn form_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("title", self.title.clone()),
            ("description", self.description.clone()),
            ("status", self.status.as_str().to_string()),
            ("priority", self.priority.as_str().to_string()),
            ("dueDate", self.due_date.format("%Y-%m-%d").to_string()),
        ];
        if let Some(id) = self.assigned_to_id {
            pairs.push(("assignedToId", id.to_string()));
        }
        pairs
    }
}

/// A file selected for upload.
///
/// Content is held only for the duration of the upload.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadFile {
    /// Name the server stores the document under.
    pub file_name: String,
    /// Declared media type.
    pub media_type: String,
    /// Raw content.
    pub content: Vec<u8>,
}

impl UploadFile {
    /// Creates an upload candidate.
    pub fn new(
        file_name: impl Into<String>,
        media_type: impl Into<String>,
        content: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            media_type: media_type.into(),
            content,
        }
    }

    /// Creates a PDF upload candidate.
    pub fn pdf(file_name: impl Into<String>, content: Vec<u8>) -> Self {
        Self::new(file_name, PDF_MEDIA_TYPE, content)
    }
}

impl fmt::Debug for UploadFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadFile")
            .field("file_name", &self.file_name)
            .field("media_type", &self.media_type)
            .field("len", &self.content.len())
            .finish()
    }
}
