//! Audio extraction through an external converter.
//!
//! [`AudioBridge::extract_audio`] fetches a resolved video into a scratch
//! file, hands it to a [`Transcoder`], and reads the audio back into memory.
//! Both scratch files are [`tempfile::TempPath`]s, so they are removed on
//! every exit path, including early returns and panics.

mod error;
mod transcoder;

pub use error::AudioError;
pub use transcoder::{FfmpegTranscoder, Transcoder};

use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempPath;
use tracing::{debug, info, instrument};

use crate::download::HttpClient;

const SCRATCH_PREFIX: &str = "tikgrab-";

/// Fetch, convert, read back, clean up.
#[derive(Clone)]
pub struct AudioBridge {
    client: HttpClient,
    transcoder: Arc<dyn Transcoder>,
    temp_dir: Option<PathBuf>,
}

impl AudioBridge {
    /// Creates a bridge that keeps scratch files in the system temp directory.
    pub fn new(client: HttpClient, transcoder: Arc<dyn Transcoder>) -> Self {
        Self {
            client,
            transcoder,
            temp_dir: None,
        }
    }

    /// Keeps scratch files under `dir` instead.
    #[must_use]
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// Extracts the audio track behind `media_url` as MP3 bytes.
    ///
    /// # Errors
    ///
    /// Returns [`AudioError`] if the source cannot be fetched, a scratch file
    /// cannot be created, the converter cannot be started or exits
    /// unsuccessfully, or its output cannot be read.
    #[instrument(skip(self), fields(transcoder = self.transcoder.name()))]
    pub async fn extract_audio(&self, media_url: &str) -> Result<Vec<u8>, AudioError> {
        let input = self.scratch_path(".mp4")?;
        let output = self.scratch_path(".mp3")?;

        let fetched = self
            .client
            .download_to_path(media_url, &input)
            .await
            .map_err(AudioError::fetch)?;
        debug!(bytes = fetched, "source fetched");

        self.transcoder.extract_audio(&input, &output).await?;

        let audio = tokio::fs::read(&output)
            .await
            .map_err(|e| AudioError::read_output(output.to_path_buf(), e))?;
        info!(bytes = audio.len(), "audio extracted");
        Ok(audio)
    }

    fn scratch_path(&self, suffix: &str) -> Result<TempPath, AudioError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(SCRATCH_PREFIX).suffix(suffix);
        let file = match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(AudioError::temp_file)?;
        Ok(file.into_temp_path())
    }
}

impl std::fmt::Debug for AudioBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioBridge")
            .field("transcoder", &self.transcoder.name())
            .field("temp_dir", &self.temp_dir)
            .finish_non_exhaustive()
    }
}
