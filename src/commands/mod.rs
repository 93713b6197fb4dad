//! CLI command handlers.

mod batch;
mod media;

pub use batch::run_batch_command;
pub use media::{run_audio_command, run_images_command, run_resolve_command, run_video_command};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tikgrab_core::{HttpClient, Resolution, Resolver, build_default_resolver};
use tracing::debug;

use crate::app_config::Settings;

/// Shared state built once per invocation.
pub struct AppContext {
    pub settings: Settings,
    pub resolver: Arc<Resolver>,
    pub client: HttpClient,
}

impl AppContext {
    pub fn new(settings: Settings) -> Result<Self> {
        let resolver = build_default_resolver(&settings.backend_http);
        if resolver.is_empty() {
            bail!("no extraction backend could be initialized");
        }
        let client = HttpClient::new_with_timeouts(
            settings.download_connect_timeout_secs,
            settings.download_read_timeout_secs,
        )
        .context("Failed to build download client")?;
        debug!(backends = ?resolver.methods_tried(), "context ready");
        Ok(Self {
            settings,
            resolver: Arc::new(resolver),
            client,
        })
    }

    /// Resolves a single link; failure is terminal for single-item commands.
    pub async fn resolve(&self, url: &str) -> Result<Resolution> {
        self.resolver
            .download_video(url)
            .await
            .with_context(|| format!("Could not resolve {url}"))
    }

    /// `--output-dir` if given, else the configured directory. Created if missing.
    pub async fn output_dir(&self, cli_override: Option<&Path>) -> Result<PathBuf> {
        let dir = cli_override.map_or_else(|| self.settings.output_dir.clone(), Path::to_path_buf);
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create output directory '{}'", dir.display()))?;
        Ok(dir)
    }
}
