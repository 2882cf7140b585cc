#![allow(clippy::module_name_repetitions)]
//! Entry points for running docker-compose against the active project.
//!
//! The binary is resolved again on every call; nothing is cached in memory.

use std::ffi::OsStr;
use std::sync::Arc;

use crate::cancel::CancelToken;
use crate::config::Settings;
use crate::datadir::{DataDirProvider, HomeDataDir};
use crate::errors::ComposeError;
use crate::exec::{ComposeIo, Executor};
use crate::resolver::{BinaryResolver, ExecutableHandle};
use crate::workdir::{FsWorkdirManager, WorkdirManager};

pub struct Compose {
    resolver: BinaryResolver,
    workdirs: Arc<dyn WorkdirManager>,
    executor: Executor,
}

impl Compose {
    pub fn new(
        resolver: BinaryResolver,
        workdirs: Arc<dyn WorkdirManager>,
        executor: Executor,
    ) -> Self {
        Self {
            resolver,
            workdirs,
            executor,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        let data_dir: Arc<dyn DataDirProvider> = Arc::new(HomeDataDir::from_settings(settings));
        Self {
            resolver: BinaryResolver::from_settings(settings, Arc::clone(&data_dir)),
            workdirs: Arc::new(FsWorkdirManager::from_settings(settings, data_dir)),
            executor: Executor::from_settings(settings),
        }
    }

    pub fn from_env() -> Self {
        Self::from_settings(&Settings::from_env())
    }

    pub fn resolve(&self, cancel: &CancelToken) -> Result<ExecutableHandle, ComposeError> {
        self.resolver.resolve(cancel)
    }

    pub fn run<S: AsRef<OsStr>>(&self, cancel: &CancelToken, args: &[S]) -> Result<(), ComposeError> {
        self.run_with_io(cancel, ComposeIo::inherit(), args)
    }

    pub fn run_with_io<S: AsRef<OsStr>>(
        &self,
        cancel: &CancelToken,
        io: ComposeIo,
        args: &[S],
    ) -> Result<(), ComposeError> {
        let handle = self.resolver.resolve(cancel)?;
        self.executor
            .execute(cancel, handle.path(), self.workdirs.as_ref(), io, args)
    }
}

/// Run docker-compose with the process's own stdio, configured from the environment.
pub fn run<S: AsRef<OsStr>>(cancel: &CancelToken, args: &[S]) -> Result<(), ComposeError> {
    Compose::from_env().run(cancel, args)
}

/// Like [`run`], with caller-supplied streams.
pub fn run_with_io<S: AsRef<OsStr>>(
    cancel: &CancelToken,
    io: ComposeIo,
    args: &[S],
) -> Result<(), ComposeError> {
    Compose::from_env().run_with_io(cancel, io, args)
}
