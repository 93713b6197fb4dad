//! Batch processing: many share links into one archive plus a manifest.
//!
//! Items are resolved and fetched with bounded concurrency, but a failure
//! in one item never reaches another. Resolution failures become failed
//! [`BatchItemResult`]s; media failures inside a resolved item become
//! `-FAILED.txt` placeholder entries.
//!
//! All fan-out is futures polled on the caller's task. Items and images both
//! run through `buffer_unordered` streams (up to the configured number in
//! flight) and are re-sorted by position once they settle; the video, audio
//! and image work of one item is joined.

mod error;
mod images;

pub use error::{BatchError, ImageArchiveError};
pub use images::{ImageArchive, build_image_archive};

use std::sync::Arc;

use futures_util::stream::{self, StreamExt};
use tracing::{debug, info, instrument, warn};

use crate::archive::naming::{
    BATCH_LABEL_FALLBACK, BATCH_LABEL_MAX_CHARS, MANIFEST_ENTRY, audio_entry, audio_failed_entry,
    image_entry, image_failed_entry, placeholder_text, video_entry, video_failed_entry,
};
use crate::archive::{ArchiveBuilder, BatchItemResult, Manifest, label_for_record};
use crate::audio::AudioBridge;
use crate::download::HttpClient;
use crate::resolver::{MediaRecord, Resolver};

/// Default number of batch items in flight.
pub const DEFAULT_CONCURRENCY: usize = 4;
/// Upper bound on batch items in flight.
pub const MAX_CONCURRENCY: usize = 100;
/// Default number of image fetches in flight per item.
pub const DEFAULT_IMAGE_CONCURRENCY: usize = 4;
/// Upper bound on image fetches in flight per item.
pub const MAX_IMAGE_CONCURRENCY: usize = 32;

/// Tuning for a [`BatchCoordinator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    /// Items processed at once (1..=100).
    pub concurrency: usize,
    /// Image fetches at once within one item (1..=32).
    pub image_concurrency: usize,
    /// Extract audio for video items. Ignored when no [`AudioBridge`] is given.
    pub include_audio: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            image_concurrency: DEFAULT_IMAGE_CONCURRENCY,
            include_audio: true,
        }
    }
}

impl BatchOptions {
    /// Checks concurrency bounds.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::InvalidConcurrency`] for an out-of-range value.
    pub fn validate(&self) -> Result<(), BatchError> {
        if !(1..=MAX_CONCURRENCY).contains(&self.concurrency) {
            return Err(BatchError::invalid_concurrency(
                "concurrency",
                self.concurrency,
                1,
                MAX_CONCURRENCY,
            ));
        }
        if !(1..=MAX_IMAGE_CONCURRENCY).contains(&self.image_concurrency) {
            return Err(BatchError::invalid_concurrency(
                "image_concurrency",
                self.image_concurrency,
                1,
                MAX_IMAGE_CONCURRENCY,
            ));
        }
        Ok(())
    }
}

/// Result of [`BatchCoordinator::process_batch`].
#[derive(Debug, Clone)]
pub struct BatchOutput {
    /// ZIP bytes, manifest included as `results.json`.
    pub archive: Vec<u8>,
    pub manifest: Manifest,
}

/// Everything one item contributes, held until the item settles.
struct ItemOutcome {
    result: BatchItemResult,
    entries: Vec<(String, Vec<u8>)>,
}

/// Fans a list of share links out to the resolver and assembles the archive.
pub struct BatchCoordinator {
    resolver: Arc<Resolver>,
    client: HttpClient,
    audio: Option<AudioBridge>,
    options: BatchOptions,
    methods_tried: Vec<String>,
}

impl BatchCoordinator {
    /// Creates a coordinator.
    ///
    /// The backend attempt order is captured once here and reported
    /// unchanged in every manifest.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::InvalidConcurrency`] if `options` is out of range.
    pub fn new(
        resolver: Arc<Resolver>,
        client: HttpClient,
        audio: Option<AudioBridge>,
        options: BatchOptions,
    ) -> Result<Self, BatchError> {
        options.validate()?;
        let methods_tried = resolver.methods_tried();
        Ok(Self {
            resolver,
            client,
            audio,
            options,
            methods_tried,
        })
    }

    #[must_use]
    pub fn methods_tried(&self) -> &[String] {
        &self.methods_tried
    }

    #[must_use]
    pub fn options(&self) -> BatchOptions {
        self.options
    }

    /// Processes every URL and returns the archive and its manifest.
    ///
    /// Individual items never fail the batch; an archive comes back even if
    /// every item failed.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::EmptyBatch`] for an empty list and
    /// [`BatchError::Archive`] if the archive cannot be produced at all.
    #[instrument(skip(self, urls), fields(items = urls.len(), concurrency = self.options.concurrency))]
    pub async fn process_batch(&self, urls: &[String]) -> Result<BatchOutput, BatchError> {
        if urls.is_empty() {
            return Err(BatchError::EmptyBatch);
        }

        let mut builder = ArchiveBuilder::new();
        let mut results = Vec::with_capacity(urls.len());

        let mut outcomes: Vec<(usize, ItemOutcome)> = stream::iter(urls.iter().enumerate())
            .map(|(index, url)| async move { (index, self.process_item(url).await) })
            .buffer_unordered(self.options.concurrency)
            .collect()
            .await;
        outcomes.sort_by_key(|(index, _)| *index);

        // Applied in input order so a later duplicate label wins.
        for (_, outcome) in outcomes {
            for (path, payload) in outcome.entries {
                if builder.add_entry(path.as_str(), payload) {
                    warn!(path = %path, url = %outcome.result.url, "label collision, earlier entry replaced");
                }
            }
            results.push(outcome.result);
        }

        let manifest = Manifest::new(self.methods_tried.clone(), results);
        builder.add_entry(MANIFEST_ENTRY, manifest.to_json_bytes()?);
        let archive = builder.serialize()?;

        info!(
            succeeded = manifest.success_count(),
            failed = manifest.failure_count(),
            bytes = archive.len(),
            "batch complete"
        );
        Ok(BatchOutput { archive, manifest })
    }

    /// Resolves every URL without fetching any media.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::EmptyBatch`] for an empty list.
    #[instrument(skip(self, urls), fields(items = urls.len()))]
    pub async fn resolve_all(&self, urls: &[String]) -> Result<Vec<BatchItemResult>, BatchError> {
        if urls.is_empty() {
            return Err(BatchError::EmptyBatch);
        }

        let mut results: Vec<(usize, BatchItemResult)> = stream::iter(urls.iter().enumerate())
            .map(|(index, url)| async move {
                let result = match self.resolver.download_video(url).await {
                    Ok(resolution) => BatchItemResult::succeeded(url.as_str(), &resolution),
                    Err(error) => BatchItemResult::failed(url.as_str(), error.to_string()),
                };
                (index, result)
            })
            .buffer_unordered(self.options.concurrency)
            .collect()
            .await;
        results.sort_by_key(|(index, _)| *index);
        Ok(results.into_iter().map(|(_, result)| result).collect())
    }

    #[instrument(skip(self))]
    async fn process_item(&self, url: &str) -> ItemOutcome {
        let resolution = match self.resolver.download_video(url).await {
            Ok(resolution) => resolution,
            Err(error) => {
                warn!(error = %error, "item failed to resolve");
                return ItemOutcome {
                    result: BatchItemResult::failed(url, error.to_string()),
                    entries: Vec::new(),
                };
            }
        };

        let record = &resolution.record;
        let label = label_for_record(record, BATCH_LABEL_MAX_CHARS, BATCH_LABEL_FALLBACK);
        debug!(label = %label, backend = %resolution.backend, "item resolved");

        let (video, audio, images) = tokio::join!(
            self.fetch_video(record, &label),
            self.fetch_audio(record, &label),
            self.fetch_images(record, &label),
        );

        let entries = video.into_iter().chain(audio).chain(images).collect();
        ItemOutcome {
            result: BatchItemResult::succeeded(url, &resolution),
            entries,
        }
    }

    async fn fetch_video(&self, record: &MediaRecord, label: &str) -> Option<(String, Vec<u8>)> {
        if record.download_url.is_empty() {
            return None;
        }
        Some(match self.client.fetch_bytes(&record.download_url).await {
            Ok(bytes) => (video_entry(label), bytes),
            Err(error) => {
                warn!(error = %error, "video fetch failed");
                (
                    video_failed_entry(label),
                    placeholder_text(&record.download_url, &error.to_string()),
                )
            }
        })
    }

    async fn fetch_audio(&self, record: &MediaRecord, label: &str) -> Option<(String, Vec<u8>)> {
        let audio = self.audio.as_ref().filter(|_| self.options.include_audio)?;
        if record.download_url.is_empty() {
            return None;
        }
        Some(match audio.extract_audio(&record.download_url).await {
            Ok(bytes) => (audio_entry(label), bytes),
            Err(error) => {
                warn!(error = %error, "audio extraction failed");
                (
                    audio_failed_entry(label),
                    placeholder_text(&record.download_url, &error.to_string()),
                )
            }
        })
    }

    async fn fetch_images(&self, record: &MediaRecord, label: &str) -> Vec<(String, Vec<u8>)> {
        if record.images.is_empty() {
            return Vec::new();
        }
        images::fetch_images(&self.client, &record.images, self.options.image_concurrency)
            .await
            .into_iter()
            .map(|fetch| match fetch.result {
                Ok(bytes) => (image_entry(label, fetch.n), bytes),
                Err(error) => {
                    warn!(n = fetch.n, error = %error, "image fetch failed");
                    (
                        image_failed_entry(label, fetch.n),
                        placeholder_text(fetch.url, &error.to_string()),
                    )
                }
            })
            .collect()
    }
}

impl std::fmt::Debug for BatchCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchCoordinator")
            .field("methods_tried", &self.methods_tried)
            .field("options", &self.options)
            .field("audio", &self.audio.is_some())
            .finish_non_exhaustive()
    }
}
