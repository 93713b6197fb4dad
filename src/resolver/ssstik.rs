//! SSSTik backend: scrapes the download form served by ssstik.io.
//!
//! The landing page embeds a per-session `s_tt` token that must accompany the
//! form post; the post answers with an HTML fragment holding the download links.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, ORIGIN, REFERER};

use super::http_client::{BackendHttpConfig, build_backend_http_client, describe_request_error};
use super::normalize::{
    absolutize_url, clean_text, compile_static_regex, decode_entities, derive_id, first_capture,
    form_body, normalize_handle,
};
use super::{AttemptOutcome, Backend, BackendPriority, MediaRecord, ResolveError};

const DEFAULT_BASE_URL: &str = "https://ssstik.io";
const NAME: &str = "SSSTik";

static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r#"s_tt\s*=\s*['"]([^'"]+)['"]"#));
static HD_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(
        r#"(?is)<a\s[^>]*href\s*=\s*["']([^"']+)["'][^>]*class\s*=\s*["'][^"']*\bwithout_watermark_hd\b"#,
    )
});
static LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(
        r#"(?is)<a\s[^>]*href\s*=\s*["']([^"']+)["'][^>]*class\s*=\s*["'][^"']*\bwithout_watermark\b"#,
    )
});
static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r#"(?is)<p[^>]*class\s*=\s*["']maintext["'][^>]*>(.*?)</p>"#));
static AUTHOR_RE: LazyLock<Regex> = LazyLock::new(|| compile_static_regex(r"(?is)<h2[^>]*>(.*?)</h2>"));
static THUMB_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(
        r#"(?is)<img[^>]*class\s*=\s*["'][^"']*result_author[^"']*["'][^>]*src\s*=\s*["']([^"']+)["']"#,
    )
});
static ERROR_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(r#"(?is)<p[^>]*class\s*=\s*["'][^"']*\berror\b[^"']*["'][^>]*>(.*?)</p>"#)
});

/// HD fallback backend scraping SSSTik.
pub struct SsstikBackend {
    client: Client,
    base_url: String,
}

impl SsstikBackend {
    /// Creates a backend against the public SSSTik host.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] if client construction fails.
    pub fn new(config: &BackendHttpConfig) -> Result<Self, ResolveError> {
        Self::with_base_url(config, DEFAULT_BASE_URL)
    }

    /// Creates a backend against a custom host (for tests).
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] if client construction fails.
    pub fn with_base_url(
        config: &BackendHttpConfig,
        base_url: impl Into<String>,
    ) -> Result<Self, ResolveError> {
        Ok(Self {
            client: build_backend_http_client(NAME, config)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn fetch_token(&self) -> Result<String, String> {
        let landing = format!("{}/en", self.base_url);
        let response = self
            .client
            .get(&landing)
            .send()
            .await
            .map_err(|e| describe_request_error(&e))?;
        if !response.status().is_success() {
            return Err(format!(
                "SSSTik landing page returned HTTP {}",
                response.status().as_u16()
            ));
        }
        let html = response.text().await.map_err(|e| describe_request_error(&e))?;
        first_capture(&html, &TOKEN_RE).ok_or_else(|| "SSSTik session token not found".to_string())
    }

    async fn submit(&self, share_url: &str, token: &str) -> Result<String, String> {
        let endpoint = format!("{}/abc?url=dl", self.base_url);
        let response = self
            .client
            .post(&endpoint)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded; charset=UTF-8")
            .header(ORIGIN, &self.base_url)
            .header(REFERER, format!("{}/en", self.base_url))
            .header("HX-Request", "true")
            .header("HX-Target", "target")
            .body(form_body(&[("id", share_url), ("locale", "en"), ("tt", token)]))
            .send()
            .await
            .map_err(|e| describe_request_error(&e))?;
        if !response.status().is_success() {
            return Err(format!("SSSTik returned HTTP {}", response.status().as_u16()));
        }
        response.text().await.map_err(|e| describe_request_error(&e))
    }
}

impl std::fmt::Debug for SsstikBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SsstikBackend")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Backend for SsstikBackend {
    fn name(&self) -> &'static str {
        NAME
    }

    fn priority(&self) -> BackendPriority {
        BackendPriority::HdFallback
    }

    #[tracing::instrument(skip(self), fields(backend = NAME))]
    async fn attempt(&self, url: &str) -> AttemptOutcome {
        let token = match self.fetch_token().await {
            Ok(token) => token,
            Err(reason) => return AttemptOutcome::Failure(reason),
        };
        match self.submit(url, &token).await {
            Ok(html) => parse_result_fragment(&html, url, &self.base_url),
            Err(reason) => AttemptOutcome::Failure(reason),
        }
    }
}

fn parse_result_fragment(html: &str, share_url: &str, base_url: &str) -> AttemptOutcome {
    let link = first_capture(html, &HD_LINK_RE).or_else(|| first_capture(html, &LINK_RE));
    let Some(link) = link else {
        let reason = first_capture(html, &ERROR_RE)
            .map(|msg| clean_text(&msg))
            .filter(|msg| !msg.is_empty())
            .unwrap_or_else(|| "no watermark-free link in SSSTik response".to_string());
        return AttemptOutcome::Failure(reason);
    };

    let title = first_capture(html, &TITLE_RE)
        .map(|t| clean_text(&t))
        .unwrap_or_default();

    AttemptOutcome::Success(MediaRecord {
        id: derive_id(None, share_url),
        title: title.clone(),
        author: first_capture(html, &AUTHOR_RE)
            .map(|a| normalize_handle(&clean_text(&a)))
            .unwrap_or_default(),
        duration: 0,
        thumbnail: first_capture(html, &THUMB_RE)
            .map(|src| absolutize_url(&decode_entities(&src), base_url))
            .unwrap_or_default(),
        download_url: absolutize_url(&decode_entities(&link), base_url),
        description: title,
        images: Vec::new(),
    })
}
