//! Fatal transport startup errors (: socket bind failure aborts startup).

use std::path::PathBuf;
use thiserror::Error;

/// Failure starting a transport socket.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The socket directory could not be created with the required mode.
    #[error("failed to create socket directory {path}: {source}")]
    SocketDir {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// The ROUTER or PUB socket was already bound (duplicate start).
    #[error("socket {path} is already in use, refusing to start a second instance")]
    AlreadyRunning {
        /// Path already bound.
        path: PathBuf,
    },
    /// The socket could not be bound for a reason other than it already
    /// being in use.
    #[error("failed to bind socket {path}: {source}")]
    Bind {
        /// Socket path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// Could not set the socket file's permission bits to 0600.
    #[error("failed to set permissions on {path}: {source}")]
    Permissions {
        /// Socket path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
}
