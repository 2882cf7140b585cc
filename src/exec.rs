use std::ffi::{OsStr, OsString};
use std::io;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::Duration;

use wait_timeout::ChildExt;

use crate::cancel::CancelToken;
use crate::config::Settings;
use crate::errors::{ComposeError, ExecError};
use crate::util::command_line;
use crate::workdir::WorkdirManager;

/// Always passed first: makes docker-compose honour v3 `deploy` keys outside swarm mode.
pub const COMPATIBILITY_FLAG: &str = "--compatibility";

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// The three streams bound to the child. They are handed to the child as-is.
#[derive(Debug)]
pub struct ComposeIo {
    stdin: Stdio,
    stdout: Stdio,
    stderr: Stdio,
}

impl ComposeIo {
    pub fn new(
        stdin: impl Into<Stdio>,
        stdout: impl Into<Stdio>,
        stderr: impl Into<Stdio>,
    ) -> Self {
        Self {
            stdin: stdin.into(),
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// The calling process's own stdin/stdout/stderr.
    pub fn inherit() -> Self {
        Self::new(Stdio::inherit(), Stdio::inherit(), Stdio::inherit())
    }

    pub fn null() -> Self {
        Self::new(Stdio::null(), Stdio::null(), Stdio::null())
    }
}

impl Default for ComposeIo {
    fn default() -> Self {
        Self::inherit()
    }
}

/// `--compatibility` followed by the caller's arguments, untouched.
pub fn compose_args<S: AsRef<OsStr>>(args: &[S]) -> Vec<OsString> {
    std::iter::once(OsString::from(COMPATIBILITY_FLAG))
        .chain(args.iter().map(|a| a.as_ref().to_os_string()))
        .collect()
}

/// Runs docker-compose in the active working directory and waits for it.
#[derive(Debug, Clone)]
pub struct Executor {
    kill_grace: Duration,
    poll_interval: Duration,
}

impl Executor {
    pub fn new(kill_grace: Duration) -> Self {
        Self {
            kill_grace,
            poll_interval: POLL_INTERVAL,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.kill_grace)
    }

    /// Validate the active workdir, spawn `binary --compatibility <args>` in it and wait.
    ///
    /// Workdir failures are returned unchanged and nothing is spawned. If `cancel`
    /// fires first, the child is terminated and reaped before `ExecError::Canceled`
    /// is returned.
    pub fn execute<S: AsRef<OsStr>>(
        &self,
        cancel: &CancelToken,
        binary: &Path,
        workdirs: &dyn WorkdirManager,
        io: ComposeIo,
        args: &[S],
    ) -> Result<(), ComposeError> {
        let argv = compose_args(args);

        let workdir = workdirs.active()?;
        workdirs.validate(&workdir)?;

        let command = command_line(binary, &argv);
        if let Some(cause) = cancel.cause() {
            return Err(ExecError::Canceled { command, cause }.into());
        }

        let mut cmd = Command::new(binary);
        cmd.args(&argv)
            .current_dir(&workdir.path)
            .stdin(io.stdin)
            .stdout(io.stdout)
            .stderr(io.stderr);

        tracing::debug!(command = %command, cwd = %workdir.path.display(), "spawning");
        let child = spawn_retrying_busy(&mut cmd).map_err(|source| ExecError::Spawn {
            command: command.clone(),
            source,
        })?;
        let mut child = ScopedChild::new(child, self.kill_grace);

        let status = loop {
            if let Some(cause) = cancel.cause() {
                tracing::debug!(command = %command, %cause, "terminating child");
                child.terminate();
                return Err(ExecError::Canceled { command, cause }.into());
            }
            match child.wait_timeout(self.poll_interval) {
                Ok(Some(status)) => break status,
                Ok(None) => continue,
                Err(source) => return Err(ExecError::Wait { command, source }.into()),
            }
        };

        if status.success() {
            Ok(())
        } else {
            Err(ExecError::Exit { command, status }.into())
        }
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_KILL_GRACE)
    }
}

/// Spawn, retrying briefly on ETXTBSY (a script that was just written may still be open).
fn spawn_retrying_busy(cmd: &mut Command) -> io::Result<Child> {
    let mut attempts = 0usize;
    loop {
        match cmd.spawn() {
            Ok(c) => return Ok(c),
            Err(e) if is_text_busy(&e) && attempts < 10 => {
                attempts += 1;
                std::thread::sleep(Duration::from_millis(50));
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(unix)]
fn is_text_busy(e: &io::Error) -> bool {
    e.raw_os_error() == Some(nix::errno::Errno::ETXTBSY as i32)
}

#[cfg(not(unix))]
fn is_text_busy(_e: &io::Error) -> bool {
    false
}

/// Child process that is terminated and reaped when dropped, unless it already exited.
struct ScopedChild {
    child: Child,
    kill_grace: Duration,
    reaped: bool,
}

impl ScopedChild {
    fn new(child: Child, kill_grace: Duration) -> Self {
        Self {
            child,
            kill_grace,
            reaped: false,
        }
    }

    fn wait_timeout(&mut self, timeout: Duration) -> io::Result<Option<ExitStatus>> {
        let status = self.child.wait_timeout(timeout)?;
        if status.is_some() {
            self.reaped = true;
        }
        Ok(status)
    }

    /// SIGTERM, wait up to the grace period, then SIGKILL; always reaps.
    fn terminate(&mut self) {
        if self.reaped {
            return;
        }
        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            let pid = Pid::from_raw(self.child.id() as i32);
            let _ = kill(pid, Signal::SIGTERM);
            match self.child.wait_timeout(self.kill_grace) {
                Ok(Some(_)) => {
                    self.reaped = true;
                    return;
                }
                _ => {
                    let _ = kill(pid, Signal::SIGKILL);
                }
            }
        }
        #[cfg(not(unix))]
        {
            let _ = self.child.kill();
        }
        let _ = self.child.wait();
        self.reaped = true;
    }
}

impl Drop for ScopedChild {
    fn drop(&mut self) {
        self.terminate();
    }
}
