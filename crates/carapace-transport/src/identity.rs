//! Opaque per-connection identity .
//!
//! The transport — not the client — assigns identity, as an
//! incrementing counter stamped onto each accepted ROUTER connection.
//! It exists only to let the session manager bind a connection to a
//! session and let the router remember which connection to answer on.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Opaque connection identity, unique for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionIdentity(u64);

impl fmt::Display for ConnectionIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Issues unique [`ConnectionIdentity`] values as connections are accepted.
#[derive(Debug, Default)]
pub struct IdentityAllocator {
    next: AtomicU64,
}

impl IdentityAllocator {
    /// Construct a fresh allocator starting at 0.
    #[must_use]
    pub fn new() -> Self {
        Self { next: AtomicU64::new(0) }
    }

    /// Allocate the next identity.
    pub fn allocate(&self) -> ConnectionIdentity {
        ConnectionIdentity(self.next.fetch_add(1, Ordering::Relaxed))
    }
}
