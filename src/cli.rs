//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

/// Resolve short-video share links into watermark-free media.
///
/// Share links are resolved through a fixed chain of extraction backends
/// (Snaptik, SSSTik, Tikwm, then the share page itself).
#[derive(Parser, Debug)]
#[command(name = "tikgrab")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Config file path (default: $XDG_CONFIG_HOME/tikgrab/config.toml)
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve a share link and print its metadata as JSON
    Resolve {
        /// Share link
        url: String,
    },
    /// Save the watermark-free video as <label>.mp4
    Video(SingleArgs),
    /// Extract the audio track and save it as <label>.mp3
    Audio(SingleArgs),
    /// Save a slideshow's images as <label>_images.zip
    Images(SingleArgs),
    /// Process many share links into one archive with a results manifest
    Batch(BatchArgs),
}

#[derive(ClapArgs, Debug)]
pub struct SingleArgs {
    /// Share link
    pub url: String,

    /// Directory to write into (default: config `output_dir`, else current directory)
    #[arg(short = 'o', long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,
}

#[derive(ClapArgs, Debug)]
pub struct BatchArgs {
    /// Share links (read from stdin, one per line, when omitted)
    pub urls: Vec<String>,

    /// Archive path (default: <output_dir>/tiktok-batch-<millis>.zip)
    #[arg(short = 'o', long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Skip audio extraction
    #[arg(long)]
    pub no_audio: bool,

    /// Maximum items processed at once (1-100)
    #[arg(short = 'c', long, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub concurrency: Option<u8>,

    /// Maximum image fetches at once per item (1-32)
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=32))]
    pub image_concurrency: Option<u8>,

    /// Only resolve and print the per-link results as JSON
    #[arg(long, conflicts_with_all = ["output", "no_audio"])]
    pub metadata_only: bool,
}
