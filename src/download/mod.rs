//! HTTP transport for resolved media locators.
//!
//! Backends only resolve; the bytes behind a locator are fetched here, either
//! fully into memory (images, archive entries) or streamed to a file (single
//! downloads, audio sources).

mod client;
mod constants;
mod error;

pub use client::HttpClient;
pub use constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
pub use error::DownloadError;
