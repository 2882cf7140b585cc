#![allow(clippy::module_name_repetitions)]
//! Small utilities: shell quoting for reproducible command lines, file mode helpers.

pub mod fs;

use std::ffi::OsStr;
use std::path::Path;

/// Render `program` and `args` as a single copy-pasteable shell command line.
pub fn command_line<S: AsRef<OsStr>>(program: &Path, args: &[S]) -> String {
    let mut words = Vec::with_capacity(args.len() + 1);
    words.push(program.as_os_str().to_string_lossy().into_owned());
    words.extend(
        args.iter()
            .map(|a| a.as_ref().to_string_lossy().into_owned()),
    );
    shell_join(&words)
}

pub fn shell_join(args: &[String]) -> String {
    args.iter()
        .map(|a| shell_escape(a))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn shell_escape(s: &str) -> String {
    if s.is_empty() {
        "''".to_string()
    } else if s
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "-_=./:@".contains(c))
    {
        s.to_string()
    } else {
        let escaped = s.replace('\'', "'\"'\"'");
        format!("'{}'", escaped)
    }
}
