//! Active project working directory: resolution and validation.
//!
//! The filesystem manager keeps one symlink, `<data-dir>/workdirs/__active__`,
//! pointing at the selected project. A directory is valid when it holds
//! every file in [`REQUIRED_FILES`].

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::Settings;
use crate::datadir::DataDirProvider;
use crate::errors::WorkdirError;

pub const WORKDIRS_DIR: &str = "workdirs";
pub const ACTIVE_LINK: &str = "__active__";
pub const REQUIRED_FILES: &[&str] = &["docker-compose.yml", ".env"];

/// A project directory the forwarded command runs in. Opaque to the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workdir {
    pub path: PathBuf,
}

impl Workdir {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

pub trait WorkdirManager: Send + Sync {
    fn active(&self) -> Result<Workdir, WorkdirError>;
    fn validate(&self, workdir: &Workdir) -> Result<(), WorkdirError>;
}

pub struct FsWorkdirManager {
    data_dir: Arc<dyn DataDirProvider>,
    pinned: Option<PathBuf>,
}

impl FsWorkdirManager {
    pub fn new(data_dir: Arc<dyn DataDirProvider>) -> Self {
        Self {
            data_dir,
            pinned: None,
        }
    }

    pub fn from_settings(settings: &Settings, data_dir: Arc<dyn DataDirProvider>) -> Self {
        Self {
            data_dir,
            pinned: settings.workdir.clone(),
        }
    }

    fn active_link(&self) -> Result<PathBuf, WorkdirError> {
        let base = self.data_dir.path().map_err(|source| WorkdirError::Io {
            path: PathBuf::from(WORKDIRS_DIR),
            source,
        })?;
        Ok(base.join(WORKDIRS_DIR).join(ACTIVE_LINK))
    }

    /// Point the active link at `target`, replacing any previous selection.
    pub fn set_active(&self, target: &Path) -> Result<Workdir, WorkdirError> {
        let link = self.active_link()?;
        let io_err = |source| WorkdirError::Io {
            path: link.clone(),
            source,
        };
        if !target.is_dir() {
            return Err(WorkdirError::NotADirectory(target.to_path_buf()));
        }
        if let Some(parent) = link.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        match fs::remove_file(&link) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(io_err(e)),
        }
        symlink_dir(target, &link).map_err(io_err)?;
        Ok(Workdir::new(target))
    }
}

impl WorkdirManager for FsWorkdirManager {
    fn active(&self) -> Result<Workdir, WorkdirError> {
        if let Some(p) = &self.pinned {
            return Ok(Workdir::new(p.clone()));
        }
        let link = self.active_link()?;
        match fs::read_link(&link) {
            Ok(target) => {
                let target = if target.is_relative() {
                    link.parent().map(|p| p.join(&target)).unwrap_or(target)
                } else {
                    target
                };
                Ok(Workdir::new(target))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(WorkdirError::NoActive),
            Err(source) => Err(WorkdirError::Io { path: link, source }),
        }
    }

    fn validate(&self, workdir: &Workdir) -> Result<(), WorkdirError> {
        match fs::metadata(&workdir.path) {
            Ok(m) if m.is_dir() => {}
            Ok(_) => return Err(WorkdirError::NotADirectory(workdir.path.clone())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(WorkdirError::NotADirectory(workdir.path.clone()))
            }
            Err(source) => {
                return Err(WorkdirError::Io {
                    path: workdir.path.clone(),
                    source,
                })
            }
        }
        let missing: Vec<String> = REQUIRED_FILES
            .iter()
            .filter(|f| !workdir.path.join(f).is_file())
            .map(|f| f.to_string())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(WorkdirError::Malformed {
                path: workdir.path.clone(),
                missing,
            })
        }
    }
}

#[cfg(unix)]
fn symlink_dir(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink_dir(target: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_dir(target, link)
}
