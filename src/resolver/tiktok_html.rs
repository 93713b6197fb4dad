//! Last-resort backend: reads the state blob embedded in the share page itself.
//!
//! Current pages carry `__UNIVERSAL_DATA_FOR_REHYDRATION__`; older ones carry
//! `SIGI_STATE` with an `ItemModule` keyed by post id. Both are tried.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE};
use serde_json::Value;

use super::http_client::{BackendHttpConfig, build_backend_http_client, describe_request_error};
use super::normalize::{compile_static_regex, derive_id, normalize_handle};
use super::{AttemptOutcome, Backend, BackendPriority, MediaRecord, ResolveError};

const NAME: &str = "Direct TikTok HTML";
const ITEM_STRUCT_POINTER: &str = "/__DEFAULT_SCOPE__/webapp.video-detail/itemInfo/itemStruct";

static REHYDRATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(
        r#"(?is)<script[^>]*id\s*=\s*["']__UNIVERSAL_DATA_FOR_REHYDRATION__["'][^>]*>(.*?)</script>"#,
    )
});
static SIGI_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(r#"(?is)<script[^>]*id\s*=\s*["']SIGI_STATE["'][^>]*>(.*?)</script>"#)
});

/// Scrapes the share page directly.
pub struct TiktokHtmlBackend {
    client: Client,
}

impl TiktokHtmlBackend {
    /// Creates the backend.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] if client construction fails.
    pub fn new(config: &BackendHttpConfig) -> Result<Self, ResolveError> {
        Ok(Self {
            client: build_backend_http_client(NAME, config)?,
        })
    }
}

impl std::fmt::Debug for TiktokHtmlBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TiktokHtmlBackend").finish_non_exhaustive()
    }
}

#[async_trait]
impl Backend for TiktokHtmlBackend {
    fn name(&self) -> &'static str {
        NAME
    }

    fn priority(&self) -> BackendPriority {
        BackendPriority::LastResort
    }

    #[tracing::instrument(skip(self), fields(backend = NAME))]
    async fn attempt(&self, url: &str) -> AttemptOutcome {
        let response = match self
            .client
            .get(url)
            .header(
                ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header(ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .send()
            .await
        {
            Ok(response) => response,
            Err(error) => return AttemptOutcome::Failure(describe_request_error(&error)),
        };

        let status = response.status();
        if !status.is_success() {
            return AttemptOutcome::failure(format!("share page returned HTTP {}", status.as_u16()));
        }

        // Short links redirect to the canonical URL, which carries the id.
        let final_url = response.url().to_string();
        let html = match response.text().await {
            Ok(html) => html,
            Err(error) => return AttemptOutcome::Failure(describe_request_error(&error)),
        };

        match extract_item(&html) {
            Ok(item) => AttemptOutcome::Success(normalize_item(&item, &final_url)),
            Err(reason) => AttemptOutcome::Failure(reason),
        }
    }
}

fn extract_item(html: &str) -> Result<Value, String> {
    if let Some(caps) = REHYDRATION_RE.captures(html) {
        let state: Value = serde_json::from_str(caps[1].trim())
            .map_err(|e| format!("rehydration state is not valid JSON: {e}"))?;
        return state
            .pointer(ITEM_STRUCT_POINTER)
            .filter(|item| item.is_object())
            .cloned()
            .ok_or_else(|| "rehydration state has no video detail".to_string());
    }

    if let Some(caps) = SIGI_RE.captures(html) {
        let state: Value = serde_json::from_str(caps[1].trim())
            .map_err(|e| format!("SIGI state is not valid JSON: {e}"))?;
        return state
            .get("ItemModule")
            .and_then(Value::as_object)
            .and_then(|items| items.values().next())
            .cloned()
            .ok_or_else(|| "SIGI state has no item".to_string());
    }

    Err("no embedded video state in share page".to_string())
}

fn str_at<'a>(item: &'a Value, pointer: &str) -> &'a str {
    item.pointer(pointer).and_then(Value::as_str).unwrap_or("")
}

fn normalize_item(item: &Value, share_url: &str) -> MediaRecord {
    let images: Vec<String> = item
        .pointer("/imagePost/images")
        .and_then(Value::as_array)
        .map(|images| {
            images
                .iter()
                .filter_map(|image| {
                    image
                        .pointer("/imageURL/urlList/0")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                })
                .collect()
        })
        .unwrap_or_default();

    let download_url = if images.is_empty() {
        str_at(item, "/video/playAddr").to_string()
    } else {
        String::new()
    };

    let author = match item.get("author") {
        Some(Value::String(handle)) => handle.as_str(),
        Some(author) => author.get("uniqueId").and_then(Value::as_str).unwrap_or(""),
        None => "",
    };

    let desc = str_at(item, "/desc").trim().to_string();
    let thumbnail = [str_at(item, "/video/cover"), str_at(item, "/video/originCover")]
        .into_iter()
        .find(|cover| !cover.is_empty())
        .unwrap_or("")
        .to_string();

    MediaRecord {
        id: derive_id(item.get("id").and_then(Value::as_str), share_url),
        title: desc.clone(),
        author: normalize_handle(author),
        duration: item
            .pointer("/video/duration")
            .and_then(Value::as_u64)
            .unwrap_or(0),
        thumbnail,
        download_url,
        description: desc,
        images,
    }
}
