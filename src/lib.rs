//! tikgrab core library
//!
//! Resolves short-video share links into watermark-free media by walking an
//! ordered chain of third-party extraction backends, then fetches the media
//! and packages it, one post at a time or as a batch archive with a manifest.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`resolver`] - Backend trait, the four backends, and the fallback chain
//! - [`download`] - HTTP transport for resolved media locators
//! - [`audio`] - Audio extraction through an external converter
//! - [`archive`] - ZIP assembly, label sanitization, and the batch manifest
//! - [`batch`] - Bounded concurrent batch processing with failure isolation

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod archive;
pub mod audio;
pub mod batch;
pub mod download;
pub mod resolver;

mod user_agent;

// Re-export commonly used types
pub use archive::{ArchiveBuilder, ArchiveError, BatchItemResult, Manifest, sanitize_label};
pub use audio::{AudioBridge, AudioError, FfmpegTranscoder, Transcoder};
pub use batch::{
    BatchCoordinator, BatchError, BatchOptions, BatchOutput, ImageArchive, ImageArchiveError,
    build_image_archive,
};
pub use download::{DownloadError, HttpClient};
pub use resolver::{
    AttemptOutcome, Backend, BackendHttpConfig, BackendPriority, MediaRecord, Resolution,
    ResolveError, Resolver, build_default_resolver,
};
pub use user_agent::BROWSER_USER_AGENT;
