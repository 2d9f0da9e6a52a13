//! Derived filesystem layout under `home` (`spec.md`).

use crate::types::CarapaceConfig;
use std::path::PathBuf;

/// The concrete paths a daemon run needs, derived from `home`. Kept
/// separate from [`CarapaceConfig`] itself since these are computed,
/// not configured.
#[derive(Debug, Clone)]
pub struct Layout {
    /// `<home>/run/sockets`.
    pub socket_dir: PathBuf,
    /// `<home>/run/sockets/requests.sock`.
    pub requests_socket: PathBuf,
    /// `<home>/run/sockets/events.sock`.
    pub events_socket: PathBuf,
    /// `<home>/data`.
    pub data_dir: PathBuf,
    /// `<home>/data/audit.sqlite`.
    pub audit_db: PathBuf,
    /// `<home>/data/claude-sessions.sqlite`.
    pub resume_db: PathBuf,
    /// `<home>/credentials`.
    pub credentials_dir: PathBuf,
}

impl CarapaceConfig {
    /// Compute the filesystem layout this configuration implies.
    #[must_use]
    pub fn layout(&self) -> Layout {
        let run_dir = self.home.join("run");
        let socket_dir = run_dir.join("sockets");
        let data_dir = self.home.join("data");
        Layout {
            requests_socket: socket_dir.join("requests.sock"),
            events_socket: socket_dir.join("events.sock"),
            socket_dir,
            audit_db: data_dir.join("audit.sqlite"),
            resume_db: data_dir.join("claude-sessions.sqlite"),
            data_dir,
            credentials_dir: self.home.join("credentials"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_rooted_under_home() {
        let mut config = CarapaceConfig::default();
        config.home = PathBuf::from("/home/carapace");
        let layout = config.layout();
        assert_eq!(layout.requests_socket, PathBuf::from("/home/carapace/run/sockets/requests.sock"));
        assert_eq!(layout.events_socket, PathBuf::from("/home/carapace/run/sockets/events.sock"));
        assert_eq!(layout.audit_db, PathBuf::from("/home/carapace/data/audit.sqlite"));
        assert_eq!(layout.resume_db, PathBuf::from("/home/carapace/data/claude-sessions.sqlite"));
        assert_eq!(layout.credentials_dir, PathBuf::from("/home/carapace/credentials"));
    }
}
