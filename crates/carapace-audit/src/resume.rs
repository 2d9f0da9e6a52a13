//! Resume-token store : `<home>/data/claude-sessions.sqlite`.

use crate::db;
use crate::error::AuditError;
use carapace_core::GroupId;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

const SCHEMA_VERSION: i32 = 1;

/// Default resume-token TTL : tokens not used within this window are
/// excluded from `get_latest` but remain visible via `list`.
pub const DEFAULT_TTL_SECONDS: i64 = 24 * 60 * 60;

/// One `(group, claudeSessionId)` resume token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumeToken {
    /// Group the token belongs to.
    pub group: GroupId,
    /// The upstream agent session id this token resumes.
    pub claude_session_id: Uuid,
    /// When this token was first seen.
    pub created_at: i64,
    /// When this token was last refreshed.
    pub last_used_at: i64,
}

/// Stores the most recent agent-session id per group so a restarted
/// container can resume where it left off.
pub struct ResumeTokenStore {
    conn: Arc<Mutex<Connection>>,
}

impl ResumeTokenStore {
    /// Open (creating if absent) the resume-token database at `path`.
    pub fn open(path: &Path) -> Result<Self, AuditError> {
        let conn = db::open(path)?;
        Self::init(&conn)?;
        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    /// Open an in-memory database, for tests.
    pub fn open_in_memory() -> Result<Self, AuditError> {
        let conn = Connection::open_in_memory()?;
        Self::init(&conn)?;
        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    fn init(conn: &Connection) -> Result<(), AuditError> {
        db::migrate(conn, SCHEMA_VERSION, |conn| {
            conn.execute_batch(                "CREATE TABLE IF NOT EXISTS claude_sessions (                    group_name TEXT NOT NULL,
                    claude_session_id TEXT NOT NULL,
                    created_at INTEGER NOT NULL,
                    last_used_at INTEGER NOT NULL,
                    PRIMARY KEY (group_name, claude_session_id)
);
                CREATE INDEX IF NOT EXISTS idx_sessions_group_recency
                    ON claude_sessions(group_name, last_used_at DESC);",
)
        })?;
        Ok(())
    }

    /// Upsert a resume token: inserts with `created_at = now` on first
    /// sight, or bumps `last_used_at` on a repeat (idempotent).
    pub async fn save(&self, group: GroupId, claude_session_id: Uuid, now: i64) -> Result<(), AuditError> {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().expect("resume-token connection mutex poisoned");
            conn.execute(                "INSERT INTO claude_sessions (group_name, claude_session_id, created_at, last_used_at)
                 VALUES (?1, ?2, ?3, ?3)
                 ON CONFLICT(group_name, claude_session_id)
                 DO UPDATE SET last_used_at = excluded.last_used_at",
                params![group.as_str(), claude_session_id.to_string(), now],
)?;
            Ok(())
        })
        .await?
    }

    /// The most recently used token for `group`, if any, whose
    /// `last_used_at` is within `ttl_seconds` of `now` (: tokens
    /// older than the TTL are excluded here but remain visible to
    /// [`Self::list`]).
    pub async fn get_latest(        &self,
        group: GroupId,
        now: i64,
        ttl_seconds: i64,
) -> Result<Option<ResumeToken>, AuditError> {
        let conn = Arc::clone(&self.conn);
        let not_before = now.saturating_sub(ttl_seconds);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().expect("resume-token connection mutex poisoned");
            conn.query_row(                "SELECT group_name, claude_session_id, created_at, last_used_at
                 FROM claude_sessions WHERE group_name = ?1 AND last_used_at >= ?2
                 ORDER BY last_used_at DESC LIMIT 1",
                params![group.as_str(), not_before],
                row_from_sql,
)
            .optional()
            .map_err(AuditError::from)
        })
        .await?
    }

    /// Every token for `group`, newest first.
    pub async fn list(&self, group: GroupId) -> Result<Vec<ResumeToken>, AuditError> {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().expect("resume-token connection mutex poisoned");
            let mut stmt = conn.prepare(                "SELECT group_name, claude_session_id, created_at, last_used_at
                 FROM claude_sessions WHERE group_name = ?1 ORDER BY last_used_at DESC",
)?;
            let rows = stmt.query_map(params![group.as_str()], row_from_sql)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
        })
        .await?
    }
}

fn row_from_sql(row: &rusqlite::Row<'_>) -> rusqlite::Result<ResumeToken> {
    let claude_session_id: String = row.get(1)?;
    Ok(ResumeToken {
        group: GroupId::new(row.get::<_, String>(0)?),
        claude_session_id: Uuid::parse_str(&claude_session_id).unwrap_or_default(),
        created_at: row.get(2)?,
        last_used_at: row.get(3)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_then_get_latest_round_trips() {
        let store = ResumeTokenStore::open_in_memory().unwrap();
        let group = GroupId::new("acme");
        let id = Uuid::new_v4();
        store.save(group.clone(), id, 100).await.unwrap();

        let latest = store.get_latest(group, 100, DEFAULT_TTL_SECONDS).await.unwrap().unwrap();
        assert_eq!(latest.claude_session_id, id);
        assert_eq!(latest.created_at, 100);
    }

    #[tokio::test]
    async fn save_is_idempotent_and_bumps_last_used() {
        let store = ResumeTokenStore::open_in_memory().unwrap();
        let group = GroupId::new("acme");
        let id = Uuid::new_v4();
        store.save(group.clone(), id, 100).await.unwrap();
        store.save(group.clone(), id, 200).await.unwrap();

        let tokens = store.list(group).await.unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].created_at, 100);
        assert_eq!(tokens[0].last_used_at, 200);
    }

    #[tokio::test]
    async fn get_latest_picks_the_most_recently_used() {
        let store = ResumeTokenStore::open_in_memory().unwrap();
        let group = GroupId::new("acme");
        let older = Uuid::new_v4();
        let newer = Uuid::new_v4();
        store.save(group.clone(), older, 100).await.unwrap();
        store.save(group.clone(), newer, 200).await.unwrap();

        let latest = store.get_latest(group, 200, DEFAULT_TTL_SECONDS).await.unwrap().unwrap();
        assert_eq!(latest.claude_session_id, newer);
    }

    #[tokio::test]
    async fn groups_are_isolated() {
        let store = ResumeTokenStore::open_in_memory().unwrap();
        store.save(GroupId::new("a"), Uuid::new_v4(), 100).await.unwrap();
        assert!(store.get_latest(GroupId::new("b"), 100, DEFAULT_TTL_SECONDS).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn get_latest_excludes_tokens_older_than_ttl_but_list_still_sees_them() {
        let store = ResumeTokenStore::open_in_memory().unwrap();
        let group = GroupId::new("acme");
        let id = Uuid::new_v4();
        store.save(group.clone(), id, 100).await.unwrap();

        let ttl = 3600;
        let now_within_ttl = 100 + ttl - 1;
        let now_past_ttl = 100 + ttl + 1;

        assert!(store.get_latest(group.clone(), now_within_ttl, ttl).await.unwrap().is_some());
        assert!(store.get_latest(group.clone(), now_past_ttl, ttl).await.unwrap().is_none());

        let tokens = store.list(group).await.unwrap();
        assert_eq!(tokens.len(), 1, "list is not TTL-filtered");
    }
}
