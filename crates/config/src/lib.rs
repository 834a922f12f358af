//! Layered configuration for shelfsync.
//!
//! Settings are merged from (lowest to highest priority):
//! 1. built-in defaults,
//! 2. the user configuration file (`config.toml`, `config.yaml` or
//!    `config.json` in the platform configuration directory, or an explicit
//!    path),
//! 3. environment variables prefixed with `SHELFSYNC_` (nested keys are
//!    separated by `__`, e.g. `SHELFSYNC_RETRY__ATTEMPTS=5`),
//! 4. command-line [`Overrides`].
//!
//! The merged [`Config`] is loose (everything optional) and must be turned
//! into [`Settings`] via [`Config::validate`] before use.

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::{OptionExt, ResultExt};
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const ENV_PREFIX: &str = "SHELFSYNC_";
const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_BACKOFF_MS: u64 = 500;
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Retry behaviour for remote catalog requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Retry {
    /// Total number of attempts, including the first one.
    pub attempts: u32,
    /// Delay before the second attempt; doubled for each following attempt.
    pub backoff_ms: u64,
}
impl Default for Retry {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_RETRY_ATTEMPTS,
            backoff_ms: DEFAULT_RETRY_BACKOFF_MS,
        }
    }
}
impl Retry {
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

/// Raw, merged configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub library: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<PathBuf>,
    pub progress_sync: bool,
    pub dry_run: bool,
    pub retry: Retry,
    pub timeout_secs: u64,
}
impl Default for Config {
    fn default() -> Self {
        Self {
            server: None,
            token: None,
            library: None,
            device: None,
            progress_sync: true,
            dry_run: false,
            retry: Retry::default(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Command-line values that take precedence over every other source.
///
/// Fields left as `None` do not override anything.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Overrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub library: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress_sync: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dry_run: Option<bool>,
}

/// Validated settings, ready to drive a sync run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server: String,
    pub token: String,
    pub library: String,
    pub device: PathBuf,
    pub progress_sync: bool,
    pub dry_run: bool,
    pub retry: Retry,
    pub timeout: Duration,
}

impl Config {
    /// Load configuration from every source.
    ///
    /// When `file` is given it must exist; otherwise the default user
    /// configuration directory is searched and missing files are ignored.
    pub fn load(file: Option<&Path>, overrides: &Overrides) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        match file {
            Some(path) => {
                if !path.is_file() {
                    exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
                }
                figment = merge_file(figment, path)?;
            },
            None => {
                for path in default_files() {
                    if path.is_file() {
                        tracing::debug!(path = %path.display(), "merging configuration file");
                        figment = merge_file(figment, &path)?;
                    }
                }
            },
        }
        figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .merge(Serialized::defaults(overrides))
            .extract()
            .or_raise(|| ErrorKind::Load)
    }

    /// Check required settings and convert into [`Settings`].
    pub fn validate(self) -> Result<Settings> {
        let server = required("server", self.server)?;
        if !(server.starts_with("http://") || server.starts_with("https://")) {
            exn::bail!(ErrorKind::Invalid {
                field: "server",
                reason: format!("expected an http(s) URL, got `{server}`"),
            });
        }
        let token = required("token", self.token)?;
        let library = required("library", self.library)?;
        let device = self.device.ok_or_raise(|| ErrorKind::Missing("device"))?;
        if !device.is_absolute() {
            exn::bail!(ErrorKind::Invalid {
                field: "device",
                reason: format!("`{}` is not an absolute path", device.display()),
            });
        }
        if self.retry.attempts == 0 {
            exn::bail!(ErrorKind::Invalid {
                field: "retry.attempts",
                reason: "at least one attempt is required".to_string(),
            });
        }
        Ok(Settings {
            server: server.trim_end_matches('/').to_string(),
            token,
            library,
            device,
            progress_sync: self.progress_sync,
            dry_run: self.dry_run,
            retry: self.retry,
            timeout: Duration::from_secs(self.timeout_secs),
        })
    }
}

fn required(field: &'static str, value: Option<String>) -> Result<String> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => exn::bail!(ErrorKind::Missing(field)),
    }
}

fn merge_file(figment: Figment, path: &Path) -> Result<Figment> {
    let extension = path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
    Ok(match extension.as_deref() {
        Some("toml") => figment.merge(Toml::file(path)),
        Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
        Some("json") => figment.merge(Json::file(path)),
        _ => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
    })
}

/// Candidate configuration files in the platform configuration directory.
pub fn default_files() -> Vec<PathBuf> {
    let Some(dirs) = ProjectDirs::from("", "", "shelfsync") else {
        return Vec::new();
    };
    ["config.toml", "config.yaml", "config.yml", "config.json"]
        .into_iter()
        .map(|name| dirs.config_dir().join(name))
        .collect()
}
