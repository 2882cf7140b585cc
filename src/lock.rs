use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cancel::{CancelCause, CancelToken};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Exclusive advisory lock serialising installs of one artifact across processes.
///
/// The lock file stays on disk after release; unlinking it would let a waiter
/// hold a lock on an inode nobody else can see.
#[derive(Debug)]
pub struct InstallLock {
    file: File,
}

impl Drop for InstallLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

/// Lock file path guarding `artifact`: the artifact path with `.lock` appended.
pub fn lock_path_for(artifact: &Path) -> PathBuf {
    let mut s = artifact.as_os_str().to_os_string();
    s.push(".lock");
    PathBuf::from(s)
}

/// Try once to take the lock at `p` without blocking.
pub fn try_acquire_lock_at(p: &Path) -> io::Result<Option<InstallLock>> {
    if let Some(parent) = p.parent() {
        fs::create_dir_all(parent)?;
    }
    let f = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(p)?;
    match f.try_lock_exclusive() {
        Ok(()) => Ok(Some(InstallLock { file: f })),
        Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
        Err(e) if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Take the lock at `p`, polling until it is free or `cancel` fires.
pub fn acquire_lock_at(p: &Path, cancel: &CancelToken) -> Result<InstallLock, LockWaitError> {
    let mut announced = false;
    loop {
        if let Some(cause) = cancel.cause() {
            return Err(LockWaitError::Canceled(cause));
        }
        if let Some(lock) = try_acquire_lock_at(p).map_err(LockWaitError::Io)? {
            return Ok(lock);
        }
        if !announced {
            tracing::debug!(path = %p.display(), "install lock held by another process; waiting");
            announced = true;
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

#[derive(Debug)]
pub enum LockWaitError {
    Io(io::Error),
    Canceled(CancelCause),
}
