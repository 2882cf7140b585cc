//! Persistent data directory used to store downloaded artifacts.

use std::fs;
use std::io;
use std::path::PathBuf;

use crate::config::Settings;

/// Name of the directory under `$HOME` used when no override is configured.
pub const DEFAULT_DIR_NAME: &str = ".compose-runner";

/// Resolves a persistent, writable directory.
pub trait DataDirProvider: Send + Sync {
    fn path(&self) -> io::Result<PathBuf>;
}

/// `COMPOSE_RUNNER_DATA_DIR` when set, else `$HOME/.compose-runner`. Created on demand.
#[derive(Debug, Clone, Default)]
pub struct HomeDataDir {
    override_dir: Option<PathBuf>,
}

impl HomeDataDir {
    pub fn new(override_dir: Option<PathBuf>) -> Self {
        Self { override_dir }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.data_dir.clone())
    }
}

impl DataDirProvider for HomeDataDir {
    fn path(&self) -> io::Result<PathBuf> {
        let dir = match &self.override_dir {
            Some(d) => d.clone(),
            None => home::home_dir()
                .ok_or_else(|| {
                    io::Error::new(io::ErrorKind::NotFound, "home directory not found")
                })?
                .join(DEFAULT_DIR_NAME),
        };
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}

/// A fixed directory, used as-is (still created on demand).
#[derive(Debug, Clone)]
pub struct FixedDataDir(pub PathBuf);

impl DataDirProvider for FixedDataDir {
    fn path(&self) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.0)?;
        Ok(self.0.clone())
    }
}
