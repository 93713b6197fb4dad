//! Shared HTTP client construction policy for extraction backends.
//!
//! Every backend gets its own client built from the same injected
//! [`BackendHttpConfig`], so timeouts and the User-Agent stay consistent and a
//! hung upstream always surfaces as a failed attempt instead of a stalled chain.

use std::time::Duration;

use reqwest::Client;
use reqwest::redirect::Policy;

use crate::user_agent;

use super::ResolveError;

const CONNECT_TIMEOUT_SECS: u64 = 10;
const READ_TIMEOUT_SECS: u64 = 30;
const MAX_REDIRECTS: usize = 10;

/// Network policy injected into every backend at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendHttpConfig {
    /// TCP/TLS connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Whole-request timeout in seconds.
    pub read_timeout_secs: u64,
}

impl Default for BackendHttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: CONNECT_TIMEOUT_SECS,
            read_timeout_secs: READ_TIMEOUT_SECS,
        }
    }
}

impl BackendHttpConfig {
    /// Creates a config with explicit timeouts.
    #[must_use]
    pub fn new(connect_timeout_secs: u64, read_timeout_secs: u64) -> Self {
        Self {
            connect_timeout_secs,
            read_timeout_secs,
        }
    }
}

/// Builds a backend HTTP client using the shared policy.
///
/// `backend_name` is only used in the error message.
///
/// # Errors
///
/// Returns [`ResolveError::BackendUnavailable`] when client construction fails.
pub(crate) fn build_backend_http_client(
    backend_name: &str,
    config: &BackendHttpConfig,
) -> Result<Client, ResolveError> {
    Client::builder()
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .timeout(Duration::from_secs(config.read_timeout_secs))
        .user_agent(user_agent::default_backend_user_agent())
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .build()
        .map_err(|error| {
            ResolveError::backend_unavailable(
                backend_name,
                &format!("HTTP client construction failed: {error}"),
            )
        })
}

/// Renders a reqwest error as a short failure reason.
pub(crate) fn describe_request_error(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        "request timed out".to_string()
    } else if error.is_connect() {
        "could not connect".to_string()
    } else if error.is_decode() {
        format!("unexpected response body: {error}")
    } else {
        format!("request failed: {error}")
    }
}
