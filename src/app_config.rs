//! Application configuration loading for CLI defaults.
//!
//! Precedence is CLI flag, then config file, then built-in default.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use tikgrab_core::BackendHttpConfig;
use tikgrab_core::batch::{
    DEFAULT_CONCURRENCY, DEFAULT_IMAGE_CONCURRENCY, MAX_CONCURRENCY, MAX_IMAGE_CONCURRENCY,
};
use tikgrab_core::download::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};

/// TOML-backed file configuration. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Default output directory for saved media and archives.
    pub output_dir: Option<PathBuf>,
    /// Batch items in flight (1..=100).
    pub concurrency: Option<usize>,
    /// Image fetches in flight per item (1..=32).
    pub image_concurrency: Option<usize>,
    /// Extract audio in batch mode.
    pub include_audio: Option<bool>,
    /// Converter binary used for audio extraction.
    pub ffmpeg_path: Option<PathBuf>,
    /// Default verbosity when no `-v`/`-q` flag is given.
    pub verbosity: Option<VerbositySetting>,
    pub backend_connect_timeout_secs: Option<u64>,
    pub backend_read_timeout_secs: Option<u64>,
    pub download_connect_timeout_secs: Option<u64>,
    pub download_read_timeout_secs: Option<u64>,
}

impl FileConfig {
    /// Validates config values against runtime and CLI constraints.
    pub fn validate(&self) -> Result<()> {
        validate_range("concurrency", self.concurrency, 1, MAX_CONCURRENCY)?;
        validate_range(
            "image_concurrency",
            self.image_concurrency,
            1,
            MAX_IMAGE_CONCURRENCY,
        )?;
        validate_timeout_secs(
            "backend_connect_timeout_secs",
            self.backend_connect_timeout_secs,
        )?;
        validate_timeout_secs("backend_read_timeout_secs", self.backend_read_timeout_secs)?;
        validate_timeout_secs(
            "download_connect_timeout_secs",
            self.download_connect_timeout_secs,
        )?;
        validate_timeout_secs(
            "download_read_timeout_secs",
            self.download_read_timeout_secs,
        )?;
        if let Some(path) = &self.ffmpeg_path
            && path.as_os_str().is_empty()
        {
            bail!("Invalid config value for `ffmpeg_path`: must not be empty");
        }
        Ok(())
    }
}

fn validate_range(field: &str, value: Option<usize>, min: usize, max: usize) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(min..=max).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: {min}..={max}");
    }
    Ok(())
}

fn validate_timeout_secs(field: &str, value: Option<u64>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(1..=3600).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: 1..=3600");
    }
    Ok(())
}

/// Supported config verbosity labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerbositySetting {
    Default,
    Verbose,
    Quiet,
    Debug,
}

impl VerbositySetting {
    /// Tracing filter directive for this label.
    #[must_use]
    pub fn filter_directive(self) -> &'static str {
        match self {
            Self::Quiet => "error",
            Self::Default => "info",
            Self::Verbose => "debug",
            Self::Debug => "trace",
        }
    }
}

/// Loaded config metadata.
#[derive(Debug, Clone, Default)]
pub struct LoadedConfig {
    /// Path that was consulted, if any.
    pub path: Option<PathBuf>,
    /// Parsed file config when a config file exists and was valid.
    pub config: Option<FileConfig>,
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/tikgrab/config.toml`
/// 2. `$HOME/.config/tikgrab/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("tikgrab")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("tikgrab")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads the config file.
///
/// An explicit path must exist; the default path is optional.
pub fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    if let Some(path) = explicit {
        let config = load_file_config(path)?;
        return Ok(LoadedConfig {
            path: Some(path.to_path_buf()),
            config: Some(config),
        });
    }

    let path = resolve_default_config_path();
    let config = match path.as_deref() {
        Some(path) if path.exists() => Some(load_file_config(path)?),
        _ => None,
    };
    Ok(LoadedConfig { path, config })
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let cfg: FileConfig = toml::from_str(raw)?;
    cfg.validate()?;
    Ok(cfg)
}

/// Effective settings after merging defaults and the config file.
///
/// CLI overrides are applied by each command on top of this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub output_dir: PathBuf,
    pub concurrency: usize,
    pub image_concurrency: usize,
    pub include_audio: bool,
    pub ffmpeg_path: PathBuf,
    pub backend_http: BackendHttpConfig,
    pub download_connect_timeout_secs: u64,
    pub download_read_timeout_secs: u64,
}

impl Settings {
    #[must_use]
    pub fn from_file(file: Option<&FileConfig>) -> Self {
        let file = file.cloned().unwrap_or_default();
        let backend_defaults = BackendHttpConfig::default();
        Self {
            output_dir: file.output_dir.unwrap_or_else(|| PathBuf::from(".")),
            concurrency: file.concurrency.unwrap_or(DEFAULT_CONCURRENCY),
            image_concurrency: file.image_concurrency.unwrap_or(DEFAULT_IMAGE_CONCURRENCY),
            include_audio: file.include_audio.unwrap_or(true),
            ffmpeg_path: file.ffmpeg_path.unwrap_or_else(|| PathBuf::from("ffmpeg")),
            backend_http: BackendHttpConfig::new(
                file.backend_connect_timeout_secs
                    .unwrap_or(backend_defaults.connect_timeout_secs),
                file.backend_read_timeout_secs
                    .unwrap_or(backend_defaults.read_timeout_secs),
            ),
            download_connect_timeout_secs: file
                .download_connect_timeout_secs
                .unwrap_or(CONNECT_TIMEOUT_SECS),
            download_read_timeout_secs: file
                .download_read_timeout_secs
                .unwrap_or(READ_TIMEOUT_SECS),
        }
    }
}
