//! In-memory archive assembly and the batch manifest.
//!
//! [`ArchiveBuilder`] collects `(path, payload)` entries and serializes them
//! once into a deflate-compressed ZIP. Paths and labels come from [`naming`].

pub mod naming;

mod manifest;

pub use manifest::{BatchItemResult, Manifest};
pub use naming::{label_for_record, sanitize_label};

use std::collections::HashMap;
use std::io::{Cursor, Write};

use thiserror::Error;
use tracing::{debug, warn};
use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

/// Errors raised while producing archive bytes.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("failed to write archive entry {path}: {source}")]
    Zip {
        path: String,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("failed to write archive entry {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to finalize archive: {source}")]
    Finish {
        #[source]
        source: zip::result::ZipError,
    },

    #[error("failed to serialize manifest: {source}")]
    Manifest {
        #[source]
        source: serde_json::Error,
    },
}

/// Named payload container, serialized once as ZIP.
///
/// Entries keep insertion order. Re-adding a path replaces the payload in
/// place (last write wins).
#[derive(Debug, Default)]
pub struct ArchiveBuilder {
    entries: Vec<(String, Vec<u8>)>,
    index: HashMap<String, usize>,
}

impl ArchiveBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an entry. Returns `true` if an earlier entry was replaced.
    pub fn add_entry(&mut self, path: impl Into<String>, payload: Vec<u8>) -> bool {
        let path = path.into();
        if let Some(&slot) = self.index.get(&path) {
            warn!(path = %path, "archive entry overwritten");
            self.entries[slot].1 = payload;
            return true;
        }
        debug!(path = %path, bytes = payload.len(), "archive entry added");
        self.index.insert(path.clone(), self.entries.len());
        self.entries.push((path, payload));
        false
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.index.contains_key(path)
    }

    /// Entry paths in insertion order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(path, _)| path.as_str())
    }

    /// Consumes the builder and produces the ZIP bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError`] if an entry cannot be written or the central
    /// directory cannot be finalized.
    #[tracing::instrument(skip(self), fields(entries = self.entries.len()))]
    pub fn serialize(self) -> Result<Vec<u8>, ArchiveError> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .unix_permissions(0o644);

        for (path, payload) in &self.entries {
            writer
                .start_file(path.as_str(), options)
                .map_err(|source| ArchiveError::Zip {
                    path: path.clone(),
                    source,
                })?;
            writer.write_all(payload).map_err(|source| ArchiveError::Io {
                path: path.clone(),
                source,
            })?;
        }

        let bytes = writer
            .finish()
            .map_err(|source| ArchiveError::Finish { source })?
            .into_inner();
        debug!(bytes = bytes.len(), "archive serialized");
        Ok(bytes)
    }
}
