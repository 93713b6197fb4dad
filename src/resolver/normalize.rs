//! Shared normalization for backend responses: regexes, URL absolutizing,
//! scraped-text cleanup, and id derivation.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

/// Compiles a regex at static init; panics on invalid pattern.
pub(crate) fn compile_static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid static regex '{pattern}': {e}"))
}

static POST_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"/(?:video|photo)/(\d+)"));
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| compile_static_regex(r"(?s)<[^>]*>"));
static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| compile_static_regex(r"\s+"));
static NUMERIC_ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"&#(x[0-9a-fA-F]+|[0-9]+);"));

/// Extracts the numeric post id from a canonical share URL.
///
/// Short links (`vm.tiktok.com/...`) carry no id and return `None`.
#[must_use]
pub fn video_id_from_url(url: &str) -> Option<String> {
    POST_ID_RE
        .captures(url)
        .and_then(|caps| caps.get(1).map(|m| m.as_str().to_string()))
}

/// Returns the backend id if present, else one derived from the share URL.
///
/// Falls back to the last non-empty path segment so the record always has an id.
pub(crate) fn derive_id(backend_id: Option<&str>, share_url: &str) -> String {
    if let Some(id) = backend_id.map(str::trim).filter(|id| !id.is_empty()) {
        return id.to_string();
    }
    if let Some(id) = video_id_from_url(share_url) {
        return id;
    }
    Url::parse(share_url)
        .ok()
        .and_then(|url| {
            url.path_segments()
                .and_then(|mut segments| segments.rfind(|s| !s.is_empty()).map(str::to_string))
        })
        .unwrap_or_else(|| "unknown".to_string())
}

/// Resolves a possibly relative locator against a backend base URL.
///
/// Absolute values pass through; `//host/...` becomes `https://host/...`;
/// empty values stay empty.
#[must_use]
pub(crate) fn absolutize_url(value: &str, base_url: &str) -> String {
    let value = value.trim();
    if value.is_empty() || value.starts_with("http://") || value.starts_with("https://") {
        return value.to_string();
    }
    if value.starts_with("//") {
        return format!("https:{value}");
    }
    Url::parse(base_url)
        .and_then(|base| base.join(value))
        .map(|url| url.to_string())
        .unwrap_or_else(|_| value.to_string())
}

/// Returns the first capture group of `regex` in `haystack`, trimmed.
pub(crate) fn first_capture(haystack: &str, regex: &Regex) -> Option<String> {
    regex
        .captures(haystack)
        .and_then(|caps| caps.get(1).map(|m| m.as_str().trim().to_string()))
        .filter(|value| !value.is_empty())
}

/// Turns a scraped HTML fragment into plain single-line text.
pub(crate) fn clean_text(fragment: &str) -> String {
    let without_tags = TAG_RE.replace_all(fragment, " ");
    let decoded = decode_entities(&without_tags);
    WHITESPACE_RE.replace_all(&decoded, " ").trim().to_string()
}

/// Decodes the handful of HTML entities scraping backends actually emit.
pub(crate) fn decode_entities(value: &str) -> String {
    let numeric = NUMERIC_ENTITY_RE.replace_all(value, |caps: &regex::Captures<'_>| {
        let raw = &caps[1];
        let code = match raw.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => raw.parse::<u32>().ok(),
        };
        code.and_then(char::from_u32)
            .map_or_else(|| caps[0].to_string(), |c| c.to_string())
    });
    numeric
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

/// Strips a leading `@` from an author handle.
pub(crate) fn normalize_handle(handle: &str) -> String {
    handle.trim().trim_start_matches('@').to_string()
}

/// Appends the backend name as a parenthesized description suffix.
///
/// Compatibility rendering only; the backend name travels explicitly on
/// [`super::Resolution`].
pub(crate) fn annotate_description(description: &str, backend: &str) -> String {
    let suffix = format!("({backend})");
    let trimmed = description.trim();
    if trimmed.ends_with(&suffix) {
        return trimmed.to_string();
    }
    if trimmed.is_empty() {
        suffix
    } else {
        format!("{trimmed} {suffix}")
    }
}

/// Encodes `pairs` as an `application/x-www-form-urlencoded` body.
pub(crate) fn form_body(pairs: &[(&str, &str)]) -> String {
    pairs
        .iter()
        .map(|(key, value)| format!("{}={}", urlencoding::encode(key), urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}
