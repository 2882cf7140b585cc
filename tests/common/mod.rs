/*!
Test support shared across integration tests.

- CountingDownloader: fake artifact downloader that records calls (optionally slow)
- StaticWorkdir: fake workdir manager with a fixed answer
- write_script(dir, name, body): write an executable shell script
- resolver_with(...): resolver chain over a private search path and data dir
*/
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use compose_runner::{
    BinaryResolver, CancelToken, DownloadError, Downloader, FixedDataDir, InstalledArtifact,
    Platform, ResolveStrategy, SearchPath, Workdir, WorkdirError, WorkdirManager,
};

pub const FAKE_ARTIFACT: &str = "#!/bin/sh\necho fake-compose \"$@\"\n";

/// Downloader that writes a fixed body (or fails) and counts invocations.
#[derive(Default)]
pub struct CountingDownloader {
    calls: AtomicUsize,
    urls: Mutex<Vec<String>>,
    fail_with_status: Option<u16>,
    delay: Option<Duration>,
}

impl CountingDownloader {
    pub fn ok() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing(status: u16) -> Arc<Self> {
        Arc::new(Self {
            fail_with_status: Some(status),
            ..Self::default()
        })
    }

    /// Succeeds after sleeping `delay`, to widen the window for racing installers.
    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay: Some(delay),
            ..Self::default()
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().expect("urls lock").clone()
    }
}

impl Downloader for CountingDownloader {
    fn download(&self, url: &str, dest: &Path, _cancel: &CancelToken) -> Result<(), DownloadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().expect("urls lock").push(url.to_string());
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        if let Some(status) = self.fail_with_status {
            return Err(DownloadError::Status {
                url: url.to_string(),
                status,
            });
        }
        fs::write(dest, FAKE_ARTIFACT).map_err(|source| DownloadError::Io {
            path: dest.to_path_buf(),
            source,
        })
    }
}

/// Workdir manager returning a fixed directory, or a fixed validation failure.
pub struct StaticWorkdir {
    path: PathBuf,
    invalid: bool,
}

impl StaticWorkdir {
    pub fn valid(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            invalid: false,
        }
    }

    pub fn invalid(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            invalid: true,
        }
    }
}

impl WorkdirManager for StaticWorkdir {
    fn active(&self) -> Result<Workdir, WorkdirError> {
        Ok(Workdir::new(self.path.clone()))
    }

    fn validate(&self, workdir: &Workdir) -> Result<(), WorkdirError> {
        if self.invalid {
            return Err(WorkdirError::Malformed {
                path: workdir.path.clone(),
                missing: vec!["docker-compose.yml".to_string()],
            });
        }
        Ok(())
    }
}

/// Write `body` to `dir/name` and mark it executable.
#[cfg(unix)]
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;
    let p = dir.join(name);
    fs::write(&p, body).expect("write script");
    fs::set_permissions(&p, fs::Permissions::from_mode(0o755)).expect("chmod script");
    p
}

/// Resolver over `search_dir` (as the only PATH entry) and `data_dir`.
pub fn resolver_with(
    search_dir: &Path,
    data_dir: &Path,
    downloader: Arc<CountingDownloader>,
    platform: Platform,
) -> BinaryResolver {
    let strategies: Vec<Box<dyn ResolveStrategy>> = vec![
        Box::new(SearchPath::in_paths(search_dir)) as Box<dyn ResolveStrategy>,
        Box::new(
            InstalledArtifact::new(Arc::new(FixedDataDir(data_dir.to_path_buf())), downloader)
                .with_platform(platform),
        ),
    ];
    BinaryResolver::with_strategies(strategies)
}
