//! CLI entry point for tikgrab.

use anyhow::Result;
use clap::Parser;
use tracing::{debug, info};

mod app_config;
mod cli;
mod commands;

use app_config::{Settings, load_config};
use cli::{Args, Command};
use commands::{
    AppContext, run_audio_command, run_batch_command, run_images_command, run_resolve_command,
    run_video_command,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();
    let loaded = load_config(args.config.as_deref())?;

    // Priority: RUST_LOG env var > quiet flag > verbose flag > config verbosity > info
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => loaded
                .config
                .as_ref()
                .and_then(|config| config.verbosity)
                .map_or("info", |verbosity| verbosity.filter_directive()),
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    // stdout carries command output; logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?args, config = ?loaded.path, "CLI arguments parsed");

    let settings = Settings::from_file(loaded.config.as_ref());
    let ctx = AppContext::new(settings)?;
    info!(backends = ctx.resolver.backend_count(), "tikgrab starting");

    match &args.command {
        Command::Resolve { url } => run_resolve_command(&ctx, url).await,
        Command::Video(single) => run_video_command(&ctx, single).await,
        Command::Audio(single) => run_audio_command(&ctx, single).await,
        Command::Images(single) => run_images_command(&ctx, single).await,
        Command::Batch(batch) => run_batch_command(&ctx, batch).await,
    }
}
