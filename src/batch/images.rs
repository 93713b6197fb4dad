//! Concurrent slideshow image fetching and the single-post image archive.

use futures_util::stream::{self, StreamExt};
use tracing::{info, instrument, warn};

use super::ImageArchiveError;
use crate::archive::ArchiveBuilder;
use crate::archive::naming::{
    IMAGE_ARCHIVE_LABEL_FALLBACK, IMAGE_ARCHIVE_LABEL_MAX_CHARS, image_archive_name,
    placeholder_text, single_image_entry, single_image_failed_entry,
};
use crate::archive::label_for_record;
use crate::download::{DownloadError, HttpClient};
use crate::resolver::MediaRecord;

/// One slideshow image fetch, tagged with its 1-based position.
pub(crate) struct ImageFetch<'a> {
    pub(crate) n: usize,
    pub(crate) url: &'a str,
    pub(crate) result: Result<Vec<u8>, DownloadError>,
}

/// Fetches every image with at most `limit` requests in flight.
///
/// Results come back in display order whatever the completion order.
pub(crate) async fn fetch_images<'a>(
    client: &HttpClient,
    urls: &'a [String],
    limit: usize,
) -> Vec<ImageFetch<'a>> {
    let mut fetches: Vec<ImageFetch<'a>> = stream::iter(urls.iter().enumerate())
        .map(|(i, url)| async move {
            ImageFetch {
                n: i + 1,
                url: url.as_str(),
                result: client.fetch_bytes(url).await,
            }
        })
        .buffer_unordered(limit.max(1))
        .collect()
        .await;
    fetches.sort_by_key(|fetch| fetch.n);
    fetches
}

/// A ZIP of one slideshow post's images.
#[derive(Debug, Clone)]
pub struct ImageArchive {
    /// `<label>_images.zip`.
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub fetched: usize,
    pub failed: usize,
}

/// Packs a slideshow post's images into a ZIP named after its label.
///
/// Entries are `tiktok-image-<n>.jpg`. With several images, each failed
/// fetch becomes `tiktok-image-<n>-FAILED.txt`; a one-image post whose
/// image cannot be fetched fails outright.
///
/// # Errors
///
/// Returns [`ImageArchiveError::NoImages`] for a post without images,
/// [`ImageArchiveError::Fetch`] when the only image fails, and
/// [`ImageArchiveError::Archive`] if the ZIP cannot be written.
#[instrument(skip(client, record), fields(id = %record.id, images = record.images.len()))]
pub async fn build_image_archive(
    client: &HttpClient,
    record: &MediaRecord,
    image_concurrency: usize,
) -> Result<ImageArchive, ImageArchiveError> {
    if record.images.is_empty() {
        return Err(ImageArchiveError::NoImages);
    }

    let label = label_for_record(
        record,
        IMAGE_ARCHIVE_LABEL_MAX_CHARS,
        IMAGE_ARCHIVE_LABEL_FALLBACK,
    );
    let single = record.images.len() == 1;
    let mut builder = ArchiveBuilder::new();
    let (mut fetched, mut failed) = (0, 0);

    for fetch in fetch_images(client, &record.images, image_concurrency).await {
        match fetch.result {
            Ok(bytes) => {
                fetched += 1;
                builder.add_entry(single_image_entry(fetch.n), bytes);
            }
            Err(source) if single => return Err(ImageArchiveError::Fetch { source }),
            Err(error) => {
                warn!(n = fetch.n, error = %error, "image fetch failed");
                failed += 1;
                builder.add_entry(
                    single_image_failed_entry(fetch.n),
                    placeholder_text(fetch.url, &error.to_string()),
                );
            }
        }
    }

    let bytes = builder.serialize()?;
    info!(fetched, failed, "image archive built");
    Ok(ImageArchive {
        file_name: image_archive_name(&label),
        bytes,
        fetched,
        failed,
    })
}
