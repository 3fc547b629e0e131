//! Host file-save mechanism for downloaded documents.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Errors from saving a download.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DownloadError {
    /// The server-provided name cannot be used as a file name.
    #[error("refusing to save under file name {0:?}")]
    InvalidFileName(String),

    /// Writing or persisting the file failed.
    #[error("failed to write {path}: {source}")]
    Io {
        /// Destination path.
        path: PathBuf,
        /// Underlying error.
        source: Arc<std::io::Error>,
    },
}

/// Receives downloaded content.
pub trait FileSink: Send + Sync {
    /// Stores `content` under `file_name` and returns where it went.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError`] if the name is unusable or the write fails.
    fn save(&self, file_name: &str, content: &[u8]) -> Result<PathBuf, DownloadError>;
}

/// Saves downloads into a directory.
///
/// Content is staged in a temporary file inside the target directory and
/// only renamed to its final name once fully written. On any failure the
/// staged file is removed.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    /// Creates a sink writing into `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Target directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

fn io_error(path: &Path, source: std::io::Error) -> DownloadError {
    DownloadError::Io {
        path: path.to_path_buf(),
        source: Arc::new(source),
    }
}

/// Rejects names that would escape the target directory.
fn checked_file_name(file_name: &str) -> Result<&str, DownloadError> {
    let name = Path::new(file_name)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| *n == file_name && !n.is_empty())
        .ok_or_else(|| DownloadError::InvalidFileName(file_name.to_string()))?;
    Ok(name)
}

impl FileSink for DirectorySink {
    fn save(&self, file_name: &str, content: &[u8]) -> Result<PathBuf, DownloadError> {
        let name = checked_file_name(file_name)?;
        let target = self.dir.join(name);

        let mut staged =
            tempfile::NamedTempFile::new_in(&self.dir).map_err(|e| io_error(&self.dir, e))?;
        staged
            .write_all(content)
            .and_then(|()| staged.flush())
            .map_err(|e| io_error(staged.path(), e))?;
        staged
            .persist(&target)
            .map_err(|e| io_error(&target, e.error))?;

        tracing::info!(path = %target.display(), bytes = content.len(), "document saved");
        Ok(target)
    }
}
