//! Shared User-Agent strings for backend and media HTTP clients.
//!
//! Extraction backends and TikTok itself serve bot-detection pages to unknown
//! agents, so backend traffic presents a desktop browser UA. Plain media fetches
//! from CDNs identify the tool.

/// Desktop browser User-Agent sent to extraction backends and share pages.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Default User-Agent for media downloads (identifies the tool).
#[must_use]
pub(crate) fn default_download_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("tikgrab/{version} (media-fetch)")
}

/// User-Agent for backend requests; shared by every adapter so no backend is singled out.
#[must_use]
pub(crate) fn default_backend_user_agent() -> String {
    BROWSER_USER_AGENT.to_string()
}
