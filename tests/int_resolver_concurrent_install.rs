#![cfg(unix)]

use compose_runner as cr;
use std::fs;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

mod common;

#[test]
fn concurrent_first_runs_share_one_install() {
    const RACERS: usize = 6;

    let empty_path = tempfile::tempdir().expect("tmpdir");
    let data = tempfile::tempdir().expect("tmpdir");
    let downloader = common::CountingDownloader::slow(Duration::from_millis(300));
    let expected = cr::install_path(data.path());
    let start = Arc::new(Barrier::new(RACERS));

    let handles: Vec<_> = (0..RACERS)
        .map(|_| {
            let search_dir = empty_path.path().to_path_buf();
            let data_dir = data.path().to_path_buf();
            let downloader = Arc::clone(&downloader);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                // Each racer builds its own resolver, as separate processes would.
                let resolver =
                    common::resolver_with(&search_dir, &data_dir, downloader, cr::Platform::Unix);
                start.wait();
                resolver.resolve(&cr::CancelToken::new())
            })
        })
        .collect();

    for h in handles {
        let handle = h
            .join()
            .expect("resolver thread panicked")
            .expect("concurrent resolve succeeds");
        assert_eq!(handle.path(), expected.as_path());
        assert_eq!(handle.source(), cr::HandleSource::Installed);
    }

    assert_eq!(downloader.calls(), 1, "only one racer may download");
    assert_eq!(
        fs::read_to_string(&expected).expect("read artifact"),
        common::FAKE_ARTIFACT
    );
    let leftovers: Vec<String> = fs::read_dir(expected.parent().expect("bin dir"))
        .expect("read_dir")
        .map(|e| e.expect("entry").file_name().to_string_lossy().into_owned())
        .filter(|n| n.ends_with(".partial"))
        .collect();
    assert!(leftovers.is_empty(), "partial downloads left behind: {leftovers:?}");
}
