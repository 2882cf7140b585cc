#![allow(clippy::module_name_repetitions)]
//! Locate or bootstrap docker-compose and run sub-commands against the active project.
//!
//! Architecture
//! - `resolver`: search-path lookup, then the pinned fallback script installed into the
//!   data directory (locked, atomic). Re-evaluated on every call.
//! - `exec`: validates the active workdir, spawns `docker-compose --compatibility ...`
//!   with caller-bound stdio and tears the child down on cancellation.
//! - `compose`: the `Compose` handle plus stateless `run`/`run_with_io`.
//! - `datadir`, `download`, `workdir`: collaborator traits with default implementations.
//!
//! Environment (see `config`)
//! - COMPOSE_RUNNER_DATA_DIR, COMPOSE_RUNNER_SKIP_PATH_LOOKUP, COMPOSE_RUNNER_RELEASE_BASE
//! - COMPOSE_RUNNER_DOWNLOAD_TIMEOUT, COMPOSE_RUNNER_KILL_GRACE, COMPOSE_RUNNER_WORKDIR
//! - COMPOSE_RUNNER_LOG (binary only)

pub mod cancel;
pub mod compose;
pub mod config;
pub mod datadir;
pub mod download;
pub mod errors;
pub mod exec;
pub mod lock;
pub mod resolver;
pub mod telemetry;
pub mod util;
pub mod workdir;

pub use cancel::{CancelCause, CancelToken};
pub use compose::{run, run_with_io, Compose};
pub use config::Settings;
pub use datadir::{DataDirProvider, FixedDataDir, HomeDataDir};
pub use download::{Downloader, HttpDownloader};
pub use errors::{
    exit_code_for_compose_error, ComposeError, DownloadError, ExecError, InstallError,
    WorkdirError,
};
pub use exec::{compose_args, ComposeIo, Executor, COMPATIBILITY_FLAG};
pub use resolver::{
    artifact_url, install_path, BinaryResolver, ExecutableHandle, HandleSource, InstalledArtifact,
    Platform, ResolveStrategy, SearchPath, COMPOSE_BIN, COMPOSE_VERSION,
};
pub use workdir::{FsWorkdirManager, Workdir, WorkdirManager};
