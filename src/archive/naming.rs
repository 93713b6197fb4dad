//! Label sanitization and entry paths.
//!
//! Every archive path is built here so the layout is defined in one place:
//!
//! ```text
//! videos/<label>.mp4            videos/<label>-FAILED.txt
//! audio/<label>.mp3             audio/<label>-FAILED.txt
//! images/<label>/img-<n>.jpg    images/<label>/img-<n>-FAILED.txt
//! results.json
//! ```

use crate::resolver::MediaRecord;

/// Length cap for labels inside batch archives.
pub const BATCH_LABEL_MAX_CHARS: usize = 60;
/// Fallback label inside batch archives.
pub const BATCH_LABEL_FALLBACK: &str = "tiktok";
/// Length cap for single-post image archive names.
pub const IMAGE_ARCHIVE_LABEL_MAX_CHARS: usize = 50;
/// Fallback name for single-post image archives.
pub const IMAGE_ARCHIVE_LABEL_FALLBACK: &str = "video";

/// Root entry holding the batch manifest.
pub const MANIFEST_ENTRY: &str = "results.json";

/// Reduces `raw` to a path-safe label.
///
/// Keeps Unicode letters and digits, `_`, `-` and whitespace (folded to a
/// single space); drops the rest. Trims, caps at `max_chars` characters,
/// trims again. Returns `fallback`
/// when nothing survives. Applying it to its own output is a no-op.
#[must_use]
pub fn sanitize_label(raw: &str, max_chars: usize, fallback: &str) -> String {
    try_sanitize(raw, max_chars).unwrap_or_else(|| fallback.to_string())
}

/// Label for a record: its title, else its id, else `fallback`.
#[must_use]
pub fn label_for_record(record: &MediaRecord, max_chars: usize, fallback: &str) -> String {
    try_sanitize(&record.title, max_chars)
        .or_else(|| try_sanitize(&record.id, max_chars))
        .unwrap_or_else(|| fallback.to_string())
}

fn try_sanitize(raw: &str, max_chars: usize) -> Option<String> {
    let mut kept = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c.is_whitespace() {
            if !kept.ends_with(' ') {
                kept.push(' ');
            }
        } else if c.is_alphanumeric() || c == '_' || c == '-' {
            kept.push(c);
        }
    }

    let capped: String = kept.trim().chars().take(max_chars).collect();
    let label = capped.trim();
    (!label.is_empty()).then(|| label.to_string())
}

#[must_use]
pub fn video_entry(label: &str) -> String {
    format!("videos/{label}.mp4")
}

#[must_use]
pub fn video_failed_entry(label: &str) -> String {
    format!("videos/{label}-FAILED.txt")
}

#[must_use]
pub fn audio_entry(label: &str) -> String {
    format!("audio/{label}.mp3")
}

#[must_use]
pub fn audio_failed_entry(label: &str) -> String {
    format!("audio/{label}-FAILED.txt")
}

/// `n` is 1-based.
#[must_use]
pub fn image_entry(label: &str, n: usize) -> String {
    format!("images/{label}/img-{n}.jpg")
}

#[must_use]
pub fn image_failed_entry(label: &str, n: usize) -> String {
    format!("images/{label}/img-{n}-FAILED.txt")
}

/// File name of a single-post image archive.
#[must_use]
pub fn image_archive_name(label: &str) -> String {
    format!("{label}_images.zip")
}

/// Entry inside a single-post image archive. `n` is 1-based.
#[must_use]
pub fn single_image_entry(n: usize) -> String {
    format!("tiktok-image-{n}.jpg")
}

#[must_use]
pub fn single_image_failed_entry(n: usize) -> String {
    format!("tiktok-image-{n}-FAILED.txt")
}

/// Body of a `-FAILED.txt` placeholder.
#[must_use]
pub fn placeholder_text(url: &str, reason: &str) -> Vec<u8> {
    format!("Failed to download: {url}\nReason: {reason}\n").into_bytes()
}
