//! Socket directory and duplicate-start handling .
//!
//! A Unix domain socket path that already exists on disk might be a
//! live listener (another instance already running — fail fast) or a
//! stale file left behind by a previous crash (safe to unlink and
//! rebind). We tell the two apart by attempting a connect: a refused
//! connection means nothing is listening.

use crate::error::TransportError;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tokio::net::{UnixListener, UnixStream};

const DIR_MODE: u32 = 0o700;
const SOCKET_MODE: u32 = 0o600;

/// Ensure `dir` exists with mode 0700 .
pub fn ensure_socket_dir(dir: &Path) -> Result<(), TransportError> {
    std::fs::create_dir_all(dir)
        .map_err(|source| TransportError::SocketDir { path: dir.to_path_buf(), source })?;
    std::fs::set_permissions(dir, std::fs::Permissions::from_mode(DIR_MODE))
        .map_err(|source| TransportError::SocketDir { path: dir.to_path_buf(), source })?;
    Ok(())
}

/// Bind a UDS at `path`, failing fast if another instance already has
/// it open, and otherwise clearing any stale socket file first. Sets
/// the resulting socket's permissions to 0600.
pub async fn bind_socket(path: &Path) -> Result<UnixListener, TransportError> {
    if path.exists() {
        if UnixStream::connect(path).await.is_ok() {
            return Err(TransportError::AlreadyRunning { path: path.to_path_buf() });
        }
        let _ = std::fs::remove_file(path);
    }

    let listener = UnixListener::bind(path)
        .map_err(|source| TransportError::Bind { path: path.to_path_buf(), source })?;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(SOCKET_MODE))
        .map_err(|source| TransportError::Permissions { path: path.to_path_buf(), source })?;
    Ok(listener)
}

/// Remove a socket file on clean shutdown (: "sockets are closed
/// and files unlinked").
pub fn unlink_socket(path: &Path) {
    let _ = std::fs::remove_file(path);
}

/// Default requests-socket path under a run directory.
#[must_use]
pub fn requests_socket_path(run_dir: &Path) -> PathBuf {
    run_dir.join("sockets").join("requests.sock")
}

/// Default events-socket path under a run directory.
#[must_use]
pub fn events_socket_path(run_dir: &Path) -> PathBuf {
    run_dir.join("sockets").join("events.sock")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn binds_a_fresh_socket_with_correct_perms() {
        let dir = tempfile::tempdir().unwrap();
        ensure_socket_dir(dir.path()).unwrap();
        let path = dir.path().join("requests.sock");
        let _listener = bind_socket(&path).await.unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, SOCKET_MODE);
    }

    #[tokio::test]
    async fn rebinds_over_a_stale_socket_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("requests.sock");
        {
            let listener = UnixListener::bind(&path).unwrap();
            drop(listener);
        }
        assert!(path.exists());
        let _listener = bind_socket(&path).await.unwrap();
    }

    #[tokio::test]
    async fn refuses_to_start_twice() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("requests.sock");
        let _first = bind_socket(&path).await.unwrap();
        let err = bind_socket(&path).await.unwrap_err();
        assert!(matches!(err, TransportError::AlreadyRunning { .. }));
    }
}
