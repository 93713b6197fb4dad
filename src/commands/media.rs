//! Single-post commands: resolve, video, audio, images.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use serde::Serialize;
use tikgrab_core::archive::naming::{IMAGE_ARCHIVE_LABEL_FALLBACK, IMAGE_ARCHIVE_LABEL_MAX_CHARS};
use tikgrab_core::archive::label_for_record;
use tikgrab_core::{AudioBridge, FfmpegTranscoder, MediaRecord, build_image_archive};
use tracing::info;

use super::AppContext;
use crate::cli::SingleArgs;

/// Metadata printed by `tikgrab resolve`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ResolveOutput<'a> {
    id: &'a str,
    download_url: &'a str,
    title: &'a str,
    author: &'a str,
    duration: u64,
    thumbnail: &'a str,
    description: &'a str,
    images: &'a [String],
    method: &'a str,
}

pub async fn run_resolve_command(ctx: &AppContext, url: &str) -> Result<()> {
    let resolution = ctx.resolve(url).await?;
    let record = &resolution.record;
    let output = ResolveOutput {
        id: &record.id,
        download_url: &record.download_url,
        title: &record.title,
        author: &record.author,
        duration: record.duration,
        thumbnail: &record.thumbnail,
        description: &record.description,
        images: &record.images,
        method: &resolution.backend,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn single_label(record: &MediaRecord) -> String {
    label_for_record(record, IMAGE_ARCHIVE_LABEL_MAX_CHARS, IMAGE_ARCHIVE_LABEL_FALLBACK)
}

fn require_video(record: &MediaRecord) -> Result<()> {
    if record.download_url.is_empty() {
        bail!(
            "Post {} is a slideshow with no video; use `tikgrab images` instead",
            record.id
        );
    }
    Ok(())
}

pub async fn run_video_command(ctx: &AppContext, args: &SingleArgs) -> Result<()> {
    let resolution = ctx.resolve(&args.url).await?;
    let record = &resolution.record;
    require_video(record)?;

    let dir = ctx.output_dir(args.output_dir.as_deref()).await?;
    let path = dir.join(format!("{}.mp4", single_label(record)));
    let bytes = ctx
        .client
        .download_to_path(&record.download_url, &path)
        .await
        .context("Failed to download video")?;

    info!(backend = %resolution.backend, bytes, "video saved");
    println!("{}", path.display());
    Ok(())
}

pub async fn run_audio_command(ctx: &AppContext, args: &SingleArgs) -> Result<()> {
    let resolution = ctx.resolve(&args.url).await?;
    let record = &resolution.record;
    require_video(record)?;

    let bridge = AudioBridge::new(
        ctx.client.clone(),
        Arc::new(FfmpegTranscoder::new(&ctx.settings.ffmpeg_path)),
    );
    let audio = bridge.extract_audio(&record.download_url).await?;

    let dir = ctx.output_dir(args.output_dir.as_deref()).await?;
    let path = dir.join(format!("{}.mp3", single_label(record)));
    tokio::fs::write(&path, &audio)
        .await
        .with_context(|| format!("Failed to write '{}'", path.display()))?;

    info!(backend = %resolution.backend, bytes = audio.len(), "audio saved");
    println!("{}", path.display());
    Ok(())
}

pub async fn run_images_command(ctx: &AppContext, args: &SingleArgs) -> Result<()> {
    let resolution = ctx.resolve(&args.url).await?;
    let record = &resolution.record;
    if !record.is_slideshow() {
        bail!("Post {} has no slideshow images; use `tikgrab video` instead", record.id);
    }

    let archive =
        build_image_archive(&ctx.client, record, ctx.settings.image_concurrency).await?;

    let dir = ctx.output_dir(args.output_dir.as_deref()).await?;
    let path = dir.join(&archive.file_name);
    tokio::fs::write(&path, &archive.bytes)
        .await
        .with_context(|| format!("Failed to write '{}'", path.display()))?;

    info!(
        fetched = archive.fetched,
        failed = archive.failed,
        "image archive saved"
    );
    println!("{}", path.display());
    Ok(())
}
