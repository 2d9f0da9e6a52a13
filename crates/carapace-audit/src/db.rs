//! Shared SQLite connection setup .

use rusqlite::Connection;
use std::path::Path;

/// Open a connection with WAL journaling, creating parent directories
/// as needed. Each store then runs its own `PRAGMA user_version`
/// migration against the freshly opened connection.
pub fn open(path: &Path) -> Result<Connection, rusqlite::Error> {
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let conn = Connection::open(path)?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    Ok(conn)
}

/// Run `body` only if the connection's `user_version` differs from
/// `version`, then stamp it. Mirrors a destructive drop-and-recreate
/// migration strategy suited to an append-mostly audit/index store
/// rather than a user's primary data.
pub fn migrate(    conn: &Connection,
    version: i32,
    body: impl FnOnce(&Connection) -> Result<(), rusqlite::Error>,
) -> Result<(), rusqlite::Error> {
    let current: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if current != version {
        body(conn)?;
        conn.pragma_update(None, "user_version", version)?;
    }
    Ok(())
}
