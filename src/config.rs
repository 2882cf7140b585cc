#![allow(clippy::module_name_repetitions)]
//! Runtime settings resolved from `COMPOSE_RUNNER_*` environment variables.
//!
//! Blank values count as unset. Durations use `humantime` syntax (`30s`, `5m`);
//! values that do not parse fall back to the default.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_DATA_DIR: &str = "COMPOSE_RUNNER_DATA_DIR";
pub const ENV_SKIP_PATH_LOOKUP: &str = "COMPOSE_RUNNER_SKIP_PATH_LOOKUP";
pub const ENV_RELEASE_BASE: &str = "COMPOSE_RUNNER_RELEASE_BASE";
pub const ENV_DOWNLOAD_TIMEOUT: &str = "COMPOSE_RUNNER_DOWNLOAD_TIMEOUT";
pub const ENV_KILL_GRACE: &str = "COMPOSE_RUNNER_KILL_GRACE";
pub const ENV_WORKDIR: &str = "COMPOSE_RUNNER_WORKDIR";
pub const ENV_LOG: &str = "COMPOSE_RUNNER_LOG";

pub const DEFAULT_RELEASE_BASE: &str = "https://github.com/docker/compose/releases/download";
pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);
pub const DEFAULT_KILL_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Explicit data directory; `None` means `$HOME/.compose-runner`.
    pub data_dir: Option<PathBuf>,
    /// Skip the search-path strategy and always use the installed fallback.
    pub skip_path_lookup: bool,
    pub release_base: String,
    pub download_timeout: Duration,
    pub kill_grace: Duration,
    /// Pinned active working directory, bypassing the `__active__` link.
    pub workdir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: None,
            skip_path_lookup: false,
            release_base: DEFAULT_RELEASE_BASE.to_string(),
            download_timeout: DEFAULT_DOWNLOAD_TIMEOUT,
            kill_grace: DEFAULT_KILL_GRACE,
            workdir: None,
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build settings from an arbitrary variable source (tests pass a closure over a map).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();
        Self {
            data_dir: get(ENV_DATA_DIR).map(PathBuf::from),
            skip_path_lookup: get(ENV_SKIP_PATH_LOOKUP)
                .map(|v| is_truthy(&v))
                .unwrap_or(false),
            release_base: get(ENV_RELEASE_BASE)
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or(defaults.release_base),
            download_timeout: get(ENV_DOWNLOAD_TIMEOUT)
                .and_then(|v| humantime::parse_duration(&v).ok())
                .unwrap_or(defaults.download_timeout),
            kill_grace: get(ENV_KILL_GRACE)
                .and_then(|v| humantime::parse_duration(&v).ok())
                .unwrap_or(defaults.kill_grace),
            workdir: get(ENV_WORKDIR).map(PathBuf::from),
        }
    }
}

pub fn is_truthy(value: &str) -> bool {
    matches!(
        value,
        "1" | "true" | "TRUE" | "yes" | "YES" | "on" | "ON"
    )
}
