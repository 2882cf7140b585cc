use std::fs;
use std::io;
use std::path::Path;

/// Owner read+execute bits required on an installed artifact.
pub const OWNER_READ_EXEC: u32 = 0o500;

/// Ensure the parent directory of `p` exists.
pub fn ensure_parent_dir(p: &Path) -> io::Result<()> {
    if let Some(parent) = p.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// True if the file mode carries owner read+execute.
#[cfg(unix)]
pub fn is_owner_runnable(meta: &fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & OWNER_READ_EXEC == OWNER_READ_EXEC
}

/// Mode bits carry no meaning off Unix; a shell script there is never runnable.
#[cfg(not(unix))]
pub fn is_owner_runnable(_meta: &fs::Metadata) -> bool {
    false
}

/// `chmod +x` plus owner read: keeps existing bits and adds 0o511.
#[cfg(unix)]
pub fn make_executable(p: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mode = fs::metadata(p)?.permissions().mode();
    fs::set_permissions(p, fs::Permissions::from_mode(mode | 0o111 | 0o400))
}

#[cfg(not(unix))]
pub fn make_executable(_p: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "execute permission cannot be set on this platform",
    ))
}
