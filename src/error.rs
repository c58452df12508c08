use std::path::PathBuf;

use thiserror::Error;

/// Terminal failure of a single chapter's patch run.
///
/// A missing payload folder is not an error (the applier returns `Ok(false)`),
/// and per-file copy failures are reported through the sink and skipped.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PatchError {
    #[error("fetch failed for drive id {id}: {message}")]
    Fetch { id: String, message: String },

    #[error("corrupt patch archive {}: {}", path.display(), message)]
    CorruptArchive { path: PathBuf, message: String },

    #[error("extraction failed: {message}")]
    Extract { message: String },

    #[error("staging directory error: {0}")]
    Staging(#[source] std::io::Error),
}

impl PatchError {
    pub fn fetch(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Fetch {
            id: id.into(),
            message: message.into(),
        }
    }

    pub fn extract(message: impl Into<String>) -> Self {
        Self::Extract {
            message: message.into(),
        }
    }
}
