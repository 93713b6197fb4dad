//! Tikwm backend: JSON API with HD and slideshow support.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use super::http_client::{BackendHttpConfig, build_backend_http_client, describe_request_error};
use super::normalize::{absolutize_url, derive_id, normalize_handle};
use super::{AttemptOutcome, Backend, BackendPriority, MediaRecord, ResolveError};

const DEFAULT_BASE_URL: &str = "https://www.tikwm.com";
const NAME: &str = "Tikwm";

/// Slideshow-capable backend backed by the Tikwm JSON API.
pub struct TikwmBackend {
    client: Client,
    base_url: String,
}

impl TikwmBackend {
    /// Creates a backend against the public Tikwm host.
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

    fn api_url(&self, share_url: &str) -> Result<Url, String> {
        Url::parse_with_params(
            &format!("{}/api/", self.base_url),
            &[("url", share_url), ("hd", "1")],
        )
        .map_err(|e| format!("invalid API URL: {e}"))
    }

    fn normalize(&self, share_url: &str, data: TikwmData) -> MediaRecord {
        let images: Vec<String> = data
            .images
            .iter()
            .map(|image| absolutize_url(image, &self.base_url))
            .filter(|image| !image.is_empty())
            .collect();

        // For slideshow posts `play` is the soundtrack, not a video.
        let download_url = if images.is_empty() {
            let preferred = if data.hdplay.trim().is_empty() {
                &data.play
            } else {
                &data.hdplay
            };
            absolutize_url(preferred, &self.base_url)
        } else {
            String::new()
        };

        let thumbnail = if data.cover.trim().is_empty() {
            &data.origin_cover
        } else {
            &data.cover
        };

        MediaRecord {
            id: derive_id(Some(&data.id), share_url),
            title: data.title.trim().to_string(),
            author: normalize_handle(&data.author.unique_id),
            duration: data.duration,
            thumbnail: absolutize_url(thumbnail, &self.base_url),
            download_url,
            description: data.title.trim().to_string(),
            images,
        }
    }
}

impl std::fmt::Debug for TikwmBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TikwmBackend")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Backend for TikwmBackend {
    fn name(&self) -> &'static str {
        NAME
    }

    fn priority(&self) -> BackendPriority {
        BackendPriority::Slideshow
    }

    #[tracing::instrument(skip(self), fields(backend = NAME))]
    async fn attempt(&self, url: &str) -> AttemptOutcome {
        let api_url = match self.api_url(url) {
            Ok(api_url) => api_url,
            Err(reason) => return AttemptOutcome::Failure(reason),
        };

        let response = match self.client.get(api_url).send().await {
            Ok(response) => response,
            Err(error) => return AttemptOutcome::Failure(describe_request_error(&error)),
        };

        let status = response.status();
        if !status.is_success() {
            return AttemptOutcome::failure(format!("Tikwm returned HTTP {}", status.as_u16()));
        }

        let envelope: TikwmEnvelope = match response.json().await {
            Ok(envelope) => envelope,
            Err(error) => return AttemptOutcome::Failure(describe_request_error(&error)),
        };

        if envelope.code != 0 {
            let msg = if envelope.msg.is_empty() {
                format!("Tikwm error code {}", envelope.code)
            } else {
                envelope.msg
            };
            return AttemptOutcome::Failure(msg);
        }

        let Some(data) = envelope.data else {
            return AttemptOutcome::failure("Tikwm response had no data");
        };

        AttemptOutcome::Success(self.normalize(url, data))
    }
}

#[derive(Debug, Deserialize)]
struct TikwmEnvelope {
    #[serde(default, deserialize_with = "null_as_default")]
    code: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    msg: String,
    data: Option<TikwmData>,
}

/// Upstream sends `null` for absent fields as often as it omits them.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TikwmData {
    #[serde(deserialize_with = "null_as_default")]
    id: String,
    #[serde(deserialize_with = "null_as_default")]
    title: String,
    #[serde(deserialize_with = "null_as_default")]
    duration: u64,
    #[serde(deserialize_with = "null_as_default")]
    cover: String,
    #[serde(deserialize_with = "null_as_default")]
    origin_cover: String,
    #[serde(deserialize_with = "null_as_default")]
    play: String,
    #[serde(deserialize_with = "null_as_default")]
    hdplay: String,
    #[serde(deserialize_with = "null_as_default")]
    images: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    author: TikwmAuthor,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TikwmAuthor {
    #[serde(deserialize_with = "null_as_default")]
    unique_id: String,
}
