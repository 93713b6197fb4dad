//! Error types for audio extraction.

use std::path::PathBuf;

use thiserror::Error;

use crate::download::DownloadError;

/// Reasons an audio extraction can fail.
///
/// Every variant renders as `audio extraction failed: ...` so callers can
/// surface it verbatim in placeholders.
#[derive(Debug, Error)]
pub enum AudioError {
    /// The source media could not be fetched.
    #[error("audio extraction failed: source fetch: {source}")]
    Fetch {
        #[source]
        source: DownloadError,
    },

    /// A scratch file could not be created.
    #[error("audio extraction failed: temp file: {source}")]
    TempFile {
        #[source]
        source: std::io::Error,
    },

    /// The converter program could not be started.
    #[error("audio extraction failed: cannot run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The converter ran and exited unsuccessfully.
    #[error("audio extraction failed: converter exited with {}: {diagnostics}", exit_label(.code))]
    Conversion {
        /// Exit code, `None` if killed by a signal.
        code: Option<i32>,
        /// Tail of the converter's stderr.
        diagnostics: String,
    },

    /// The converter output could not be read back.
    #[error("audio extraction failed: reading {path}: {source}")]
    ReadOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[allow(clippy::ref_option)]
fn exit_label(code: &Option<i32>) -> String {
    code.map_or_else(|| "signal".to_string(), |code| format!("code {code}"))
}

impl AudioError {
    pub fn fetch(source: DownloadError) -> Self {
        Self::Fetch { source }
    }

    pub fn temp_file(source: std::io::Error) -> Self {
        Self::TempFile { source }
    }

    pub fn spawn(program: impl Into<String>, source: std::io::Error) -> Self {
        Self::Spawn {
            program: program.into(),
            source,
        }
    }

    pub fn conversion(code: Option<i32>, diagnostics: impl Into<String>) -> Self {
        Self::Conversion {
            code,
            diagnostics: diagnostics.into(),
        }
    }

    pub fn read_output(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ReadOutput {
            path: path.into(),
            source,
        }
    }
}
