//! External converter seam.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, instrument};

use super::AudioError;

const DIAGNOSTIC_TAIL_LINES: usize = 20;

/// Converts a media file into an audio file.
///
/// Implementations must leave `output` fully written on `Ok`. They never
/// delete `input`; scratch file lifetime belongs to the caller.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Program or adapter name, for logs.
    fn name(&self) -> &str;

    /// Extracts the audio track of `input` into `output`.
    async fn extract_audio(&self, input: &Path, output: &Path) -> Result<(), AudioError>;
}

/// Runs `ffmpeg -i <in> -q:a 0 -map a -y <out>`.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    program: PathBuf,
}

impl FfmpegTranscoder {
    /// Uses a specific converter binary.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    #[instrument(skip(self), fields(program = %self.program.display()))]
    async fn extract_audio(&self, input: &Path, output: &Path) -> Result<(), AudioError> {
        let result = Command::new(&self.program)
            .arg("-i")
            .arg(input)
            .args(["-q:a", "0", "-map", "a", "-y"])
            .arg(output)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| AudioError::spawn(self.program.display().to_string(), e))?;

        if !result.status.success() {
            let diagnostics = stderr_tail(&result.stderr);
            debug!(status = %result.status, "converter failed");
            return Err(AudioError::conversion(result.status.code(), diagnostics));
        }

        Ok(())
    }
}

/// Last few stderr lines; ffmpeg prints its banner first and the cause last.
fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(DIAGNOSTIC_TAIL_LINES);
    lines[start..].join("\n")
}
