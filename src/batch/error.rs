//! Error types for batch and image-archive assembly.
//!
//! Per-item failures are data, not errors: they end up in the manifest and
//! as placeholder entries. Only configuration problems and a failure to
//! produce the archive itself surface here.

use thiserror::Error;

use crate::archive::ArchiveError;
use crate::download::DownloadError;

/// Errors that abort a whole batch.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("{name} must be between {min} and {max}, got {value}")]
    InvalidConcurrency {
        name: &'static str,
        value: usize,
        min: usize,
        max: usize,
    },

    #[error("no URLs provided")]
    EmptyBatch,

    #[error(transparent)]
    Archive(#[from] ArchiveError),
}

impl BatchError {
    pub fn invalid_concurrency(name: &'static str, value: usize, min: usize, max: usize) -> Self {
        Self::InvalidConcurrency {
            name,
            value,
            min,
            max,
        }
    }
}

/// Errors from building a single-post image archive.
#[derive(Debug, Error)]
pub enum ImageArchiveError {
    #[error("post has no images")]
    NoImages,

    /// The only image of a one-image post could not be fetched.
    #[error("failed to download image: {source}")]
    Fetch {
        #[source]
        source: DownloadError,
    },

    #[error(transparent)]
    Archive(#[from] ArchiveError),
}
