#![allow(clippy::module_name_repetitions)]
//! Artifact download over HTTP(S).
//!
//! The body is copied in chunks and the cancel token is checked between chunks.
//! A read that stalls inside the transport is only interrupted by the client
//! timeout (`COMPOSE_RUNNER_DOWNLOAD_TIMEOUT`, capped by the token's deadline),
//! not by `CancelToken::cancel`.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::time::Duration;

use crate::cancel::CancelToken;
use crate::config::Settings;
use crate::errors::DownloadError;
use crate::util::fs::ensure_parent_dir;

const CHUNK_SIZE: usize = 64 * 1024;

/// Fetches a URL into a local file.
pub trait Downloader: Send + Sync {
    fn download(&self, url: &str, dest: &Path, cancel: &CancelToken) -> Result<(), DownloadError>;
}

#[derive(Debug, Clone)]
pub struct HttpDownloader {
    timeout: Duration,
}

impl HttpDownloader {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.download_timeout)
    }

    fn client(&self, cancel: &CancelToken) -> reqwest::Result<reqwest::blocking::Client> {
        let timeout = cancel
            .remaining()
            .map_or(self.timeout, |r| r.min(self.timeout));
        reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("compose-runner/", env!("CARGO_PKG_VERSION")))
            .build()
    }
}

impl Default for HttpDownloader {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_DOWNLOAD_TIMEOUT)
    }
}

impl Downloader for HttpDownloader {
    fn download(&self, url: &str, dest: &Path, cancel: &CancelToken) -> Result<(), DownloadError> {
        let canceled = |cause| DownloadError::Canceled {
            url: url.to_string(),
            cause,
        };
        if let Some(cause) = cancel.cause() {
            return Err(canceled(cause));
        }

        let http = |source| DownloadError::Http {
            url: url.to_string(),
            source,
        };
        let client = self.client(cancel).map_err(http)?;
        let mut resp = client.get(url).send().map_err(http)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(DownloadError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let io_err = |source| DownloadError::Io {
            path: dest.to_path_buf(),
            source,
        };
        ensure_parent_dir(dest).map_err(io_err)?;
        let mut out = File::create(dest).map_err(io_err)?;

        let mut buf = vec![0u8; CHUNK_SIZE];
        let mut total: u64 = 0;
        loop {
            if let Some(cause) = cancel.cause() {
                return Err(canceled(cause));
            }
            let n = resp.read(&mut buf).map_err(|source| DownloadError::Transfer {
                url: url.to_string(),
                source,
            })?;
            if n == 0 {
                break;
            }
            out.write_all(&buf[..n]).map_err(io_err)?;
            total += n as u64;
        }
        out.sync_all().map_err(io_err)?;
        tracing::debug!(url, bytes = total, dest = %dest.display(), "download complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufRead;
    use std::net::TcpListener;

    /// Serve exactly one HTTP response on an ephemeral port; returns the base URL.
    fn serve_once(status_line: &'static str, body: &'static [u8]) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        std::thread::spawn(move || {
            if let Ok((stream, _)) = listener.accept() {
                let mut reader = std::io::BufReader::new(stream.try_clone().expect("clone"));
                let mut line = String::new();
                while reader.read_line(&mut line).map(|n| n > 0).unwrap_or(false) {
                    if line == "\r\n" {
                        break;
                    }
                    line.clear();
                }
                let mut stream = stream;
                let head = format!(
                    "HTTP/1.1 {status_line}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    body.len()
                );
                let _ = stream.write_all(head.as_bytes());
                let _ = stream.write_all(body);
                let _ = stream.flush();
            }
        });
        format!("http://{addr}")
    }

    #[test]
    fn writes_body_to_destination() {
        let base = serve_once("200 OK", b"#!/bin/sh\necho compose\n");
        let td = tempfile::tempdir().expect("tmpdir");
        let dest = td.path().join("bin").join("run.sh");
        HttpDownloader::new(Duration::from_secs(10))
            .download(&format!("{base}/run.sh"), &dest, &CancelToken::new())
            .expect("download");
        let got = std::fs::read(&dest).expect("read");
        assert_eq!(got, b"#!/bin/sh\necho compose\n");
    }

    #[test]
    fn non_success_status_is_reported_and_nothing_written() {
        let base = serve_once("404 Not Found", b"nope");
        let td = tempfile::tempdir().expect("tmpdir");
        let dest = td.path().join("run.sh");
        let err = HttpDownloader::new(Duration::from_secs(10))
            .download(&format!("{base}/run.sh"), &dest, &CancelToken::new())
            .expect_err("404 must fail");
        assert!(
            matches!(err, DownloadError::Status { status: 404, .. }),
            "unexpected error: {err}"
        );
        assert!(!dest.exists());
    }

    #[test]
    fn canceled_token_short_circuits() {
        let token = CancelToken::new();
        token.cancel();
        let td = tempfile::tempdir().expect("tmpdir");
        let err = HttpDownloader::default()
            .download("http://127.0.0.1:9/run.sh", &td.path().join("x"), &token)
            .expect_err("canceled");
        assert!(matches!(err, DownloadError::Canceled { .. }));
    }
}
