use std::io;

use thiserror::Error;

/// Failure of a single file in an upload batch.
///
/// It never affects the other files of the batch.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("failed to read {path}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to upload {path}")]
    Transport {
        path: String,
        #[source]
        source: opendal::Error,
    },
}

impl UploadError {
    /// The relative path of the file that failed.
    pub fn path(&self) -> &str {
        match self {
            UploadError::Read { path, .. } | UploadError::Transport { path, .. } => path,
        }
    }
}
