#![cfg(unix)]

use compose_runner as cr;
use nix::sys::signal::kill;
use nix::unistd::Pid;
use std::fs;
use std::time::{Duration, Instant};

mod common;

fn wait_for_pid(pidfile: &std::path::Path) -> Pid {
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        if let Ok(s) = fs::read_to_string(pidfile) {
            if let Ok(n) = s.trim().parse::<i32>() {
                return Pid::from_raw(n);
            }
        }
        assert!(Instant::now() < deadline, "child never wrote its pid");
        std::thread::sleep(Duration::from_millis(20));
    }
}

fn sleeper(bin: &std::path::Path, pidfile: &std::path::Path, trap_term: bool) -> std::path::PathBuf {
    let trap = if trap_term { "trap '' TERM\n" } else { "" };
    common::write_script(
        bin,
        "docker-compose",
        &format!(
            "#!/bin/sh\n{trap}echo $$ > '{}'\nwhile :; do sleep 1; done\n",
            pidfile.display()
        ),
    )
}

#[test]
fn cancel_terminates_running_child() {
    let bin = tempfile::tempdir().expect("tmpdir");
    let project = tempfile::tempdir().expect("tmpdir");
    let pidfile = project.path().join("pid");
    let script = sleeper(bin.path(), &pidfile, false);

    let token = cr::CancelToken::new();
    let canceller = {
        let token = token.clone();
        let pidfile = pidfile.clone();
        std::thread::spawn(move || {
            let pid = wait_for_pid(&pidfile);
            token.cancel();
            pid
        })
    };

    let started = Instant::now();
    let err = cr::Executor::new(Duration::from_millis(500))
        .execute(
            &token,
            &script,
            &common::StaticWorkdir::valid(project.path()),
            cr::ComposeIo::null(),
            &["up"],
        )
        .expect_err("canceled run");
    let pid = canceller.join().expect("canceller thread");

    assert!(err.is_canceled(), "unexpected error: {err}");
    assert!(matches!(
        err,
        cr::ComposeError::Exec(cr::ExecError::Canceled {
            cause: cr::CancelCause::Canceled,
            ..
        })
    ));
    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(kill(pid, None).is_err(), "child still running after cancel");
    assert_eq!(cr::exit_code_for_compose_error(&err), 130);
}

#[test]
fn deadline_kills_child_that_ignores_sigterm() {
    let bin = tempfile::tempdir().expect("tmpdir");
    let project = tempfile::tempdir().expect("tmpdir");
    let pidfile = project.path().join("pid");
    let script = sleeper(bin.path(), &pidfile, true);

    let token = cr::CancelToken::new().with_timeout(Duration::from_millis(700));
    let started = Instant::now();
    let err = cr::Executor::new(Duration::from_millis(200))
        .execute(
            &token,
            &script,
            &common::StaticWorkdir::valid(project.path()),
            cr::ComposeIo::null(),
            &["up"],
        )
        .expect_err("deadline");
    let pid = wait_for_pid(&pidfile);

    assert!(matches!(
        err,
        cr::ComposeError::Exec(cr::ExecError::Canceled {
            cause: cr::CancelCause::DeadlineExceeded,
            ..
        })
    ));
    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(kill(pid, None).is_err(), "child survived SIGKILL escalation");
}

#[test]
fn already_canceled_token_never_spawns() {
    let bin = tempfile::tempdir().expect("tmpdir");
    let project = tempfile::tempdir().expect("tmpdir");
    let pidfile = project.path().join("pid");
    let script = sleeper(bin.path(), &pidfile, false);
    let token = cr::CancelToken::new();
    token.cancel();

    let err = cr::Executor::default()
        .execute(
            &token,
            &script,
            &common::StaticWorkdir::valid(project.path()),
            cr::ComposeIo::null(),
            &["up"],
        )
        .expect_err("canceled");
    assert!(err.is_canceled());
    std::thread::sleep(Duration::from_millis(100));
    assert!(!pidfile.exists());
}
