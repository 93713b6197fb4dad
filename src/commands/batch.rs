//! Batch command: many links into one archive, or metadata only.

use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use serde_json::json;
use tikgrab_core::{AudioBridge, BatchCoordinator, BatchOptions, FfmpegTranscoder};
use tracing::{info, warn};

use super::AppContext;
use crate::cli::BatchArgs;

pub async fn run_batch_command(ctx: &AppContext, args: &BatchArgs) -> Result<()> {
    let urls = collect_urls(&args.urls)?;

    let options = BatchOptions {
        concurrency: args
            .concurrency
            .map_or(ctx.settings.concurrency, usize::from),
        image_concurrency: args
            .image_concurrency
            .map_or(ctx.settings.image_concurrency, usize::from),
        include_audio: ctx.settings.include_audio && !args.no_audio,
    };

    let audio = (options.include_audio && !args.metadata_only).then(|| {
        AudioBridge::new(
            ctx.client.clone(),
            Arc::new(FfmpegTranscoder::new(&ctx.settings.ffmpeg_path)),
        )
    });

    let coordinator =
        BatchCoordinator::new(Arc::clone(&ctx.resolver), ctx.client.clone(), audio, options)?;

    if args.metadata_only {
        let results = coordinator.resolve_all(&urls).await?;
        let output = json!({ "success": true, "results": results });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let output = coordinator.process_batch(&urls).await?;

    let path = match &args.output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent).await.with_context(|| {
                    format!("Failed to create output directory '{}'", parent.display())
                })?;
            }
            path.clone()
        }
        None => default_archive_path(ctx).await?,
    };
    tokio::fs::write(&path, &output.archive)
        .await
        .with_context(|| format!("Failed to write '{}'", path.display()))?;

    let failed = output.manifest.failure_count();
    if failed > 0 {
        warn!(failed, "some links could not be resolved; see results.json in the archive");
    }
    info!(
        succeeded = output.manifest.success_count(),
        failed,
        "batch archive saved"
    );
    println!("{}", path.display());
    Ok(())
}

async fn default_archive_path(ctx: &AppContext) -> Result<PathBuf> {
    let dir = ctx.output_dir(None).await?;
    Ok(dir.join(format!(
        "tiktok-batch-{}.zip",
        Utc::now().timestamp_millis()
    )))
}

/// Positional links, else non-empty stdin lines when stdin is piped.
fn collect_urls(positional: &[String]) -> Result<Vec<String>> {
    if !positional.is_empty() {
        return Ok(positional.to_vec());
    }
    if io::stdin().is_terminal() {
        return Ok(Vec::new());
    }
    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .context("Failed to read links from stdin")?;
    Ok(parse_url_lines(&buffer))
}

fn parse_url_lines(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}
