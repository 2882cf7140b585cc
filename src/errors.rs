//! Error taxonomy and exit-code mapping.
//!
//! - Workdir errors pass through `ComposeError::Workdir` unchanged.
//! - Every failure of the fallback install is wrapped in `ComposeError::Alternative`;
//!   the `InstallError` underneath stays inspectable.
//! - Child failures keep the shell-quoted command line so they can be reproduced.
//! - Exit codes: child's own code for non-zero exits, 130 for cancellation,
//!   127 when the binary cannot be found, 1 for everything else.
use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

use crate::cancel::CancelCause;

/// Failures reported by a `WorkdirManager`.
#[derive(Debug, Error)]
pub enum WorkdirError {
    #[error("no active working directory; select a project first")]
    NoActive,
    #[error("active working directory {} is not a directory", .0.display())]
    NotADirectory(PathBuf),
    #[error("working directory {} is not valid, missing: {}", .path.display(), .missing.join(", "))]
    Malformed { path: PathBuf, missing: Vec<String> },
    #[error("cannot read working directory {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Failures reported by a `Downloader`.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("request to {url} returned HTTP status {status}")]
    Status { url: String, status: u16 },
    #[error("reading response from {url} failed: {source}")]
    Transfer {
        url: String,
        #[source]
        source: io::Error,
    },
    #[error("cannot write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("download of {url} {cause}")]
    Canceled { url: String, cause: CancelCause },
}

/// Failures while obtaining the fallback artifact.
#[derive(Debug, Error)]
pub enum InstallError {
    #[error("cannot resolve data directory: {0}")]
    DataDir(#[source] io::Error),
    #[error("{} can not be run", .path.display())]
    NotRunnable { path: PathBuf },
    #[error("compose in container is not compatible with Windows")]
    UnsupportedPlatform,
    #[error(transparent)]
    Download(#[from] DownloadError),
    #[error("cannot change permission to {}: {source}", .path.display())]
    Permissions {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid artifact URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("installation {0}")]
    Canceled(CancelCause),
    #[error("docker-compose not found and no installation strategy applies")]
    Exhausted,
}

/// Failures of the spawned child process.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("`{command}` {status}")]
    Exit { command: String, status: ExitStatus },
    #[error("`{command}` {cause}")]
    Canceled { command: String, cause: CancelCause },
    #[error("failed waiting for `{command}`: {source}")]
    Wait {
        command: String,
        #[source]
        source: io::Error,
    },
}

impl ExecError {
    pub fn command(&self) -> &str {
        match self {
            ExecError::Spawn { command, .. }
            | ExecError::Exit { command, .. }
            | ExecError::Canceled { command, .. }
            | ExecError::Wait { command, .. } => command,
        }
    }
}

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error(transparent)]
    Workdir(#[from] WorkdirError),
    #[error("error while trying docker-compose container alternative: {0}")]
    Alternative(#[source] InstallError),
    #[error(transparent)]
    Exec(#[from] ExecError),
}

impl From<InstallError> for ComposeError {
    fn from(e: InstallError) -> Self {
        ComposeError::Alternative(e)
    }
}

impl ComposeError {
    /// The install failure underneath, when no usable binary could be obtained.
    pub fn install_error(&self) -> Option<&InstallError> {
        match self {
            ComposeError::Alternative(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_canceled(&self) -> bool {
        matches!(
            self,
            ComposeError::Exec(ExecError::Canceled { .. })
                | ComposeError::Alternative(InstallError::Canceled(_))
                | ComposeError::Alternative(InstallError::Download(DownloadError::Canceled { .. }))
        )
    }

    /// True when the user could fix this by installing docker-compose manually.
    pub fn suggests_manual_install(&self) -> bool {
        matches!(
            self,
            ComposeError::Alternative(
                InstallError::UnsupportedPlatform
                    | InstallError::Download(_)
                    | InstallError::NotRunnable { .. }
                    | InstallError::Permissions { .. }
            )
        )
    }
}

/// Map an io::Error to a process exit code: 127 for NotFound, 1 otherwise.
pub fn exit_code_for_io_error(e: &io::Error) -> u8 {
    if e.kind() == io::ErrorKind::NotFound {
        127
    } else {
        1
    }
}

pub fn exit_code_for_compose_error(e: &ComposeError) -> u8 {
    if e.is_canceled() {
        return 130;
    }
    match e {
        ComposeError::Exec(ExecError::Exit { status, .. }) => status
            .code()
            .and_then(|c| u8::try_from(c).ok())
            .filter(|c| *c != 0)
            .unwrap_or(1),
        ComposeError::Exec(ExecError::Spawn { source, .. }) => exit_code_for_io_error(source),
        _ => 1,
    }
}
