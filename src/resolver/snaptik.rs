//! Snaptik backend: scrapes the snaptik.app download form.

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

const DEFAULT_BASE_URL: &str = "https://snaptik.app";
const NAME: &str = "Snaptik";

static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(r#"(?is)<input[^>]*name\s*=\s*["']token["'][^>]*value\s*=\s*["']([^"']+)["']"#)
});
static DOWNLOAD_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(
        r#"(?is)<a\s[^>]*href\s*=\s*["']([^"']+)["'][^>]*class\s*=\s*["'][^"']*\bdownload-file\b"#,
    )
});
static TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(r#"(?is)<div[^>]*class\s*=\s*["']video-title["'][^>]*>(.*?)</div>"#)
});
static AUTHOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(r#"(?is)<div[^>]*class\s*=\s*["']info["'][^>]*>\s*<span[^>]*>(.*?)</span>"#)
});
static THUMB_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(r#"(?is)<div[^>]*class\s*=\s*["']video-header["'][^>]*>\s*<img[^>]*src\s*=\s*["']([^"']+)["']"#)
});

/// Primary backend scraping Snaptik.
pub struct SnaptikBackend {
    client: Client,
    base_url: String,
}

impl SnaptikBackend {
    /// Creates a backend against the public Snaptik host.
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
        let response = self
            .client
            .get(format!("{}/en", self.base_url))
            .send()
            .await
            .map_err(|e| describe_request_error(&e))?;
        if !response.status().is_success() {
            return Err(format!(
                "Snaptik landing page returned HTTP {}",
                response.status().as_u16()
            ));
        }
        let html = response.text().await.map_err(|e| describe_request_error(&e))?;
        first_capture(&html, &TOKEN_RE).ok_or_else(|| "Snaptik form token not found".to_string())
    }
}

impl std::fmt::Debug for SnaptikBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnaptikBackend")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Backend for SnaptikBackend {
    fn name(&self) -> &'static str {
        NAME
    }

    fn priority(&self) -> BackendPriority {
        BackendPriority::Primary
    }

    #[tracing::instrument(skip(self), fields(backend = NAME))]
    async fn attempt(&self, url: &str) -> AttemptOutcome {
        let token = match self.fetch_token().await {
            Ok(token) => token,
            Err(reason) => return AttemptOutcome::Failure(reason),
        };

        let response = match self
            .client
            .post(format!("{}/abc2.php", self.base_url))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(ORIGIN, &self.base_url)
            .header(REFERER, format!("{}/en", self.base_url))
            .body(form_body(&[("url", url), ("lang", "en"), ("token", &token)]))
            .send()
            .await
        {
            Ok(response) => response,
            Err(error) => return AttemptOutcome::Failure(describe_request_error(&error)),
        };

        if !response.status().is_success() {
            return AttemptOutcome::failure(format!(
                "Snaptik returned HTTP {}",
                response.status().as_u16()
            ));
        }

        match response.text().await {
            Ok(html) => parse_result_page(&html, url, &self.base_url),
            Err(error) => AttemptOutcome::Failure(describe_request_error(&error)),
        }
    }
}

fn parse_result_page(html: &str, share_url: &str, base_url: &str) -> AttemptOutcome {
    let Some(link) = first_capture(html, &DOWNLOAD_RE) else {
        return AttemptOutcome::failure("no download link in Snaptik response");
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
