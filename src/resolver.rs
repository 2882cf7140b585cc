#![allow(clippy::module_name_repetitions)]
//! docker-compose discovery and fallback installation.
//!
//! Resolution is an ordered chain of strategies; the first one yielding a handle wins:
//! 1. `SearchPath`: `docker-compose` on PATH, trusted as-is.
//! 2. `InstalledArtifact`: the pinned container wrapper script at
//!    `<data-dir>/bin/docker-compose-<version>.sh`, downloaded on first use.
//!
//! An existing artifact without owner read+execute is an error, never a re-download.
//! First installs take an exclusive lock next to the artifact, download into a
//! temporary file in the same directory and rename it into place.

use std::env;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use url::Url;

use crate::cancel::CancelToken;
use crate::config::Settings;
use crate::datadir::{DataDirProvider, HomeDataDir};
use crate::download::{Downloader, HttpDownloader};
use crate::errors::{ComposeError, InstallError};
use crate::lock::{acquire_lock_at, lock_path_for, LockWaitError};
use crate::util::fs::{is_owner_runnable, make_executable};

/// Executable name looked up on the search path.
pub const COMPOSE_BIN: &str = "docker-compose";

/// docker-compose release installed when none is found on the search path.
pub const COMPOSE_VERSION: &str = "1.24.0";

/// Folder under the data directory holding installed artifacts.
pub const BIN_DIR: &str = "bin";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Unix,
    Windows,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Unix
        }
    }

    /// The fallback is a shell script; it cannot run on Windows.
    pub fn supports_fallback(self) -> bool {
        self != Platform::Windows
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleSource {
    SearchPath,
    Installed,
}

/// A runnable docker-compose, resolved fresh for each invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutableHandle {
    path: PathBuf,
    version: Option<String>,
    source: HandleSource,
}

impl ExecutableHandle {
    pub fn from_search_path(path: PathBuf) -> Self {
        Self {
            path,
            version: None,
            source: HandleSource::SearchPath,
        }
    }

    pub fn installed(path: PathBuf, version: &str) -> Self {
        Self {
            path,
            version: Some(version.to_string()),
            source: HandleSource::Installed,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Pinned version when the handle points at an installed fallback.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn source(&self) -> HandleSource {
        self.source
    }
}

/// Deterministic install location: `<data-dir>/bin/docker-compose-<version>.sh`.
pub fn install_path(data_dir: &Path) -> PathBuf {
    data_dir
        .join(BIN_DIR)
        .join(format!("{COMPOSE_BIN}-{COMPOSE_VERSION}.sh"))
}

/// `<release_base>/<version>/run.sh`.
pub fn artifact_url(release_base: &str) -> Result<Url, InstallError> {
    let raw = format!(
        "{}/{}/run.sh",
        release_base.trim_end_matches('/'),
        COMPOSE_VERSION
    );
    Url::parse(&raw).map_err(|source| InstallError::InvalidUrl { url: raw, source })
}

/// One step of the resolution chain. `Ok(None)` means "not applicable, try the next one".
pub trait ResolveStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    fn resolve(&self, cancel: &CancelToken) -> Result<Option<ExecutableHandle>, InstallError>;
}

/// Looks up `docker-compose` on a search path (the process PATH unless overridden).
#[derive(Debug, Clone, Default)]
pub struct SearchPath {
    paths: Option<OsString>,
}

impl SearchPath {
    pub fn from_env() -> Self {
        Self { paths: None }
    }

    /// Search only `paths` (a PATH-style list) instead of the process PATH.
    pub fn in_paths(paths: impl Into<OsString>) -> Self {
        Self {
            paths: Some(paths.into()),
        }
    }
}

impl ResolveStrategy for SearchPath {
    fn name(&self) -> &'static str {
        "search-path"
    }

    fn resolve(&self, _cancel: &CancelToken) -> Result<Option<ExecutableHandle>, InstallError> {
        let found = match &self.paths {
            Some(paths) => {
                let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
                which::which_in(COMPOSE_BIN, Some(paths), cwd)
            }
            None => which::which(COMPOSE_BIN),
        };
        let Ok(path) = found else {
            return Ok(None);
        };
        let path = match path.to_str().map(str::trim) {
            Some("") => return Ok(None),
            Some(trimmed) => PathBuf::from(trimmed),
            None => path,
        };
        if path.as_os_str().is_empty() {
            return Ok(None);
        }
        Ok(Some(ExecutableHandle::from_search_path(path)))
    }
}

/// The pinned wrapper script, installed into the data directory on first use.
pub struct InstalledArtifact {
    data_dir: Arc<dyn DataDirProvider>,
    downloader: Arc<dyn Downloader>,
    platform: Platform,
    release_base: String,
}

impl InstalledArtifact {
    pub fn new(data_dir: Arc<dyn DataDirProvider>, downloader: Arc<dyn Downloader>) -> Self {
        Self {
            data_dir,
            downloader,
            platform: Platform::current(),
            release_base: crate::config::DEFAULT_RELEASE_BASE.to_string(),
        }
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn with_release_base(mut self, base: impl Into<String>) -> Self {
        self.release_base = base.into();
        self
    }

    fn existing(&self, path: &Path) -> Result<Option<ExecutableHandle>, InstallError> {
        match fs::metadata(path) {
            Ok(meta) => {
                if !meta.is_file() || !is_owner_runnable(&meta) {
                    return Err(InstallError::NotRunnable {
                        path: path.to_path_buf(),
                    });
                }
                Ok(Some(ExecutableHandle::installed(
                    path.to_path_buf(),
                    COMPOSE_VERSION,
                )))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(InstallError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    fn install(&self, path: &Path, cancel: &CancelToken) -> Result<(), InstallError> {
        let url = artifact_url(&self.release_base)?;
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let io_err = |source| InstallError::Io {
            path: dir.to_path_buf(),
            source,
        };
        fs::create_dir_all(dir).map_err(io_err)?;

        // Removed on drop unless persisted, so a failed download leaves nothing behind.
        let partial = tempfile::Builder::new()
            .prefix(".docker-compose-")
            .suffix(".partial")
            .tempfile_in(dir)
            .map_err(io_err)?
            .into_temp_path();

        tracing::info!(
            version = COMPOSE_VERSION,
            url = %url,
            dest = %path.display(),
            "installing docker-compose container alternative"
        );
        self.downloader
            .download(url.as_str(), &partial, cancel)?;
        make_executable(&partial).map_err(|source| InstallError::Permissions {
            path: path.to_path_buf(),
            source,
        })?;
        partial.persist(path).map_err(|e| InstallError::Io {
            path: path.to_path_buf(),
            source: e.error,
        })?;
        Ok(())
    }
}

impl ResolveStrategy for InstalledArtifact {
    fn name(&self) -> &'static str {
        "installed-artifact"
    }

    fn resolve(&self, cancel: &CancelToken) -> Result<Option<ExecutableHandle>, InstallError> {
        let data_dir = self.data_dir.path().map_err(InstallError::DataDir)?;
        let path = install_path(&data_dir);

        if let Some(handle) = self.existing(&path)? {
            return Ok(Some(handle));
        }
        if !self.platform.supports_fallback() {
            return Err(InstallError::UnsupportedPlatform);
        }

        let lock_path = lock_path_for(&path);
        let _lock = acquire_lock_at(&lock_path, cancel).map_err(|e| match e {
            LockWaitError::Canceled(cause) => InstallError::Canceled(cause),
            LockWaitError::Io(source) => InstallError::Io {
                path: lock_path.clone(),
                source,
            },
        })?;
        // Another process may have completed the install while we waited.
        if let Some(handle) = self.existing(&path)? {
            return Ok(Some(handle));
        }
        self.install(&path, cancel)?;
        Ok(Some(ExecutableHandle::installed(path, COMPOSE_VERSION)))
    }
}

/// Ordered chain of resolution strategies.
pub struct BinaryResolver {
    strategies: Vec<Box<dyn ResolveStrategy>>,
}

impl BinaryResolver {
    pub fn with_strategies(strategies: Vec<Box<dyn ResolveStrategy>>) -> Self {
        Self { strategies }
    }

    /// Search path (unless skipped), then the installed fallback in `data_dir`.
    pub fn from_settings(settings: &Settings, data_dir: Arc<dyn DataDirProvider>) -> Self {
        let mut strategies: Vec<Box<dyn ResolveStrategy>> = Vec::new();
        if !settings.skip_path_lookup {
            strategies.push(Box::new(SearchPath::from_env()));
        }
        strategies.push(Box::new(
            InstalledArtifact::new(data_dir, Arc::new(HttpDownloader::from_settings(settings)))
                .with_release_base(settings.release_base.clone()),
        ));
        Self { strategies }
    }

    pub fn from_env() -> Self {
        let settings = Settings::from_env();
        let data_dir = Arc::new(HomeDataDir::from_settings(&settings));
        Self::from_settings(&settings, data_dir)
    }

    pub fn resolve(&self, cancel: &CancelToken) -> Result<ExecutableHandle, ComposeError> {
        for strategy in &self.strategies {
            if let Some(handle) = strategy.resolve(cancel)? {
                tracing::debug!(
                    strategy = strategy.name(),
                    path = %handle.path().display(),
                    "resolved docker-compose"
                );
                return Ok(handle);
            }
            tracing::debug!(strategy = strategy.name(), "strategy not applicable");
        }
        Err(InstallError::Exhausted.into())
    }
}
