//! Share-link resolution through an ordered chain of extraction backends.
//!
//! A share URL is handed to each registered [`Backend`] in a fixed priority
//! order until one of them returns a usable [`MediaRecord`]. Every backend
//! talks to a different, unreliable third-party service, so a backend never
//! raises: it reports [`AttemptOutcome::Failure`] and the [`Resolver`] moves on.
//!
//! # Architecture
//!
//! - [`Backend`] - Async trait that individual extraction services implement
//! - [`Resolver`] - Priority-ordered backend chain with the fallback loop
//! - [`AttemptOutcome`] - Result of one backend attempt
//! - [`SnaptikBackend`] - Primary, scrapes the Snaptik download form
//! - [`SsstikBackend`] - HD fallback, scrapes the SSSTik download form
//! - [`TikwmBackend`] - JSON API with slideshow support
//! - [`TiktokHtmlBackend`] - Last resort, reads the share page's embedded state
//!
//! # Example
//!
//! ```no_run
//! use tikgrab_core::resolver::{BackendHttpConfig, build_default_resolver};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let resolver = build_default_resolver(&BackendHttpConfig::default());
//! let resolution = resolver
//!     .download_video("https://www.tiktok.com/@user/video/7234567890123456789")
//!     .await?;
//! println!("{} via {}", resolution.record.download_url, resolution.backend);
//! # Ok(())
//! # }
//! ```

mod error;
mod http_client;
mod normalize;
mod registry;
mod snaptik;
mod ssstik;
mod tiktok_html;
mod tikwm;

pub use error::{BackendFailure, ResolveError};
pub use http_client::BackendHttpConfig;
pub use normalize::video_id_from_url;
pub use registry::Resolver;
pub use snaptik::SnaptikBackend;
pub use ssstik::SsstikBackend;
pub use tiktok_html::TiktokHtmlBackend;
pub use tikwm::TikwmBackend;

use async_trait::async_trait;
use serde::Serialize;
use tracing::warn;

/// Builds the default backend chain used by CLI execution flows.
///
/// Attempt order is `Snaptik`, `SSSTik`, `Tikwm`, `Direct TikTok HTML`. A
/// backend whose HTTP client cannot be constructed is skipped with a warning.
#[must_use]
pub fn build_default_resolver(config: &BackendHttpConfig) -> Resolver {
    let mut resolver = Resolver::new();

    match SnaptikBackend::new(config) {
        Ok(backend) => resolver.register(Box::new(backend)),
        Err(error) => warn!(error = %error, "Snaptik backend unavailable; continuing"),
    }
    match SsstikBackend::new(config) {
        Ok(backend) => resolver.register(Box::new(backend)),
        Err(error) => warn!(error = %error, "SSSTik backend unavailable; continuing"),
    }
    match TikwmBackend::new(config) {
        Ok(backend) => resolver.register(Box::new(backend)),
        Err(error) => warn!(error = %error, "Tikwm backend unavailable; continuing"),
    }
    match TiktokHtmlBackend::new(config) {
        Ok(backend) => resolver.register(Box::new(backend)),
        Err(error) => warn!(error = %error, "Direct HTML backend unavailable; continuing"),
    }

    resolver
}

/// Static priority slot of a backend in the chain.
///
/// Backends are attempted in ascending order; within one slot, registration
/// order is kept. The order never changes at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BackendPriority {
    /// Watermark-free HD, tried first.
    Primary = 0,
    /// Alternate HD source.
    HdFallback = 1,
    /// Backend that can also return slideshow images.
    Slideshow = 2,
    /// Raw scrape of the share page.
    LastResort = 3,
}

/// Normalized description of one post, whichever backend produced it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRecord {
    /// Backend-assigned id, or one derived from the share URL.
    pub id: String,
    pub title: String,
    /// Author handle, without the leading `@`.
    pub author: String,
    /// Duration in seconds; `0` when unknown.
    pub duration: u64,
    pub thumbnail: String,
    /// Watermark-free download target. Empty for slideshow posts.
    pub download_url: String,
    pub description: String,
    /// Slideshow image locators in display order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
}

impl MediaRecord {
    /// Returns true if the record points at something downloadable.
    #[must_use]
    pub fn has_media(&self) -> bool {
        !self.download_url.is_empty() || !self.images.is_empty()
    }

    /// Returns true for image-sequence posts.
    #[must_use]
    pub fn is_slideshow(&self) -> bool {
        !self.images.is_empty()
    }
}

/// Outcome of a single backend attempt. Never partially populated.
#[derive(Debug, Clone)]
pub enum AttemptOutcome {
    /// The backend produced a record.
    Success(MediaRecord),
    /// The backend could not extract; the reason is kept for diagnostics.
    Failure(String),
}

impl AttemptOutcome {
    /// Shorthand for a failure with a formatted reason.
    pub fn failure(reason: impl Into<String>) -> Self {
        Self::Failure(reason.into())
    }
}

/// A successful resolution: the record and the backend that produced it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    pub record: MediaRecord,
    /// Name of the satisfying backend, as listed by [`Resolver::methods_tried`].
    pub backend: String,
}

/// Trait that all extraction backends implement.
///
/// # Contract
///
/// `attempt` must not panic or return early with an error: network failures,
/// timeouts, unexpected payloads, and upstream rejections all come back as
/// [`AttemptOutcome::Failure`]. Implementations hold no mutable state and may
/// be called concurrently for different URLs.
///
/// # Object Safety
///
/// Uses `async_trait` so the resolver can hold `Box<dyn Backend>`.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Display name, also used in the manifest's `methodsTried`.
    fn name(&self) -> &str;

    /// Static slot in the attempt order.
    fn priority(&self) -> BackendPriority;

    /// Attempts to turn a share URL into a media record.
    async fn attempt(&self, url: &str) -> AttemptOutcome;
}
