//! Client-side checks run before a task form is submitted.
//!
//! These checks only save a round trip; the server enforces the same rules.

use taskdesk_proto::task::{MAX_TASK_DOCUMENTS, PDF_MEDIA_TYPE, UploadFile};

/// A form failed a pre-submission check. No request was sent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// More files were selected than the task has free document slots.
    #[error("maximum {0} more file(s) allowed")]
    TooManyFiles(usize),

    /// A selected file is not a PDF.
    #[error("only PDF files are allowed ({0})")]
    InvalidFileType(String),

    /// A required form field was left empty.
    #[error("{0} is required")]
    MissingField(&'static str),
}

/// Checks candidate uploads against the task's remaining capacity.
///
/// `existing` is the number of documents already attached (0 when
/// creating). The count is checked before the media types.
///
/// # Errors
///
/// [`ValidationError::TooManyFiles`] carrying the number of free slots, or
/// [`ValidationError::InvalidFileType`] naming the first non-PDF file.
pub fn validate_attachments(
    existing: usize,
    candidates: Vec<UploadFile>,
) -> Result<Vec<UploadFile>, ValidationError> {
    let remaining = MAX_TASK_DOCUMENTS.saturating_sub(existing);
    if candidates.len() > remaining {
        return Err(ValidationError::TooManyFiles(remaining));
    }
    if let Some(bad) = candidates.iter().find(|f| f.media_type != PDF_MEDIA_TYPE) {
        return Err(ValidationError::InvalidFileType(bad.file_name.clone()));
    }
    Ok(candidates)
}
