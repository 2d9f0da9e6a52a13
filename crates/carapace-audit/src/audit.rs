//! Append-only audit log .
//!
//! One row per terminated request. Only structural descriptors are
//! stored — never `arguments` or `result`.

use crate::db;
use crate::error::AuditError;
use carapace_core::{CorrelationId, ErrorCode, GroupId, SessionId};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex};

const SCHEMA_VERSION: i32 = 1;

/// One terminated request, as written to the `audit` table.
#[derive(Debug, Clone)]
pub struct AuditRow {
    /// Unix timestamp (seconds) the request terminated.
    pub ts: i64,
    /// Owning session.
    pub session: SessionId,
    /// Owning group.
    pub group: GroupId,
    /// Tool name invoked (or the fixed topic, for non-tool requests).
    pub tool: String,
    /// Client-supplied correlation id, if any.
    pub correlation: Option<CorrelationId>,
    /// Pipeline stage the request terminated at (1-6).
    pub stage: u8,
    /// The error code the request terminated with, or `None` on success.
    pub code: Option<ErrorCode>,
    /// Total time spent in the pipeline.
    pub duration_ms: u64,
}

/// Append-only log of terminated requests (`<home>/data/audit.sqlite`).
pub struct AuditLog {
    conn: Arc<Mutex<Connection>>,
}

impl AuditLog {
    /// Open (creating if absent) the audit database at `path`.
    pub fn open(path: &Path) -> Result<Self, AuditError> {
        let conn = db::open(path)?;
        db::migrate(&conn, SCHEMA_VERSION, |conn| {
            conn.execute_batch(                "CREATE TABLE IF NOT EXISTS audit (                    ts INTEGER NOT NULL,
                    session TEXT NOT NULL,
                    group_name TEXT NOT NULL,
                    tool TEXT NOT NULL,
                    correlation TEXT,
                    stage INTEGER NOT NULL,
                    code TEXT,
                    duration_ms INTEGER NOT NULL
);
                CREATE INDEX IF NOT EXISTS idx_audit_session ON audit(session);
                CREATE INDEX IF NOT EXISTS idx_audit_tool ON audit(tool);
                CREATE INDEX IF NOT EXISTS idx_audit_ts ON audit(ts);",
)
        })?;
        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    /// Open an in-memory database, for tests.
    pub fn open_in_memory() -> Result<Self, AuditError> {
        let conn = Connection::open_in_memory()?;
        db::migrate(&conn, SCHEMA_VERSION, |conn| {
            conn.execute_batch(                "CREATE TABLE audit (                    ts INTEGER NOT NULL,
                    session TEXT NOT NULL,
                    group_name TEXT NOT NULL,
                    tool TEXT NOT NULL,
                    correlation TEXT,
                    stage INTEGER NOT NULL,
                    code TEXT,
                    duration_ms INTEGER NOT NULL
);",
)
        })?;
        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    /// Append one row. The pipeline calls this exactly once per
    /// terminated request .
    pub async fn record(&self, row: AuditRow) -> Result<(), AuditError> {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().expect("audit connection mutex poisoned");
            conn.execute(                "INSERT INTO audit (ts, session, group_name, tool, correlation, stage, code, duration_ms)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    row.ts,
                    row.session.to_string(),
                    row.group.as_str(),
                    row.tool,
                    row.correlation.map(|c| c.to_string()),
                    row.stage,
                    row.code.map(|c| c.to_string()),
                    row.duration_ms,
                ],
)?;
            Ok(())
        })
        .await?
    }

    /// Rows for a given session, newest first.
    pub async fn by_session(&self, session: SessionId) -> Result<Vec<AuditRow>, AuditError> {
        self.query("WHERE session = ?1 ORDER BY ts DESC", session.to_string()).await
    }

    /// Rows for a given tool name, newest first.
    pub async fn by_tool(&self, tool: impl Into<String>) -> Result<Vec<AuditRow>, AuditError> {
        self.query("WHERE tool = ?1 ORDER BY ts DESC", tool.into()).await
    }

    /// Rows within `[start, end]` (unix seconds), newest first.
    pub async fn by_time_range(&self, start: i64, end: i64) -> Result<Vec<AuditRow>, AuditError> {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().expect("audit connection mutex poisoned");
            let mut stmt = conn.prepare(                "SELECT ts, session, group_name, tool, correlation, stage, code, duration_ms
                 FROM audit WHERE ts BETWEEN ?1 AND ?2 ORDER BY ts DESC",
)?;
            let rows = stmt.query_map(params![start, end], row_from_sql)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
        })
        .await?
    }

    async fn query(&self, clause: &'static str, param: String) -> Result<Vec<AuditRow>, AuditError> {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().expect("audit connection mutex poisoned");
            let sql = format!(                "SELECT ts, session, group_name, tool, correlation, stage, code, duration_ms FROM audit {clause}"
);
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![param], row_from_sql)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
        })
        .await?
    }
}

fn row_from_sql(row: &rusqlite::Row<'_>) -> rusqlite::Result<AuditRow> {
    let session: String = row.get(1)?;
    let correlation: Option<String> = row.get(4)?;
    let code: Option<String> = row.get(6)?;
    Ok(AuditRow {
        ts: row.get(0)?,
        session: session.parse().unwrap_or_default(),
        group: GroupId::new(row.get::<_, String>(2)?),
        tool: row.get(3)?,
        correlation: correlation.and_then(|c| c.parse().ok()),
        stage: row.get(5)?,
        code: code.and_then(|c| parse_error_code(&c)),
        duration_ms: row.get::<_, i64>(7)? as u64,
    })
}

fn parse_error_code(s: &str) -> Option<ErrorCode> {
    use ErrorCode::*;
    Some(match s {
        "UNKNOWN_TOOL" => UnknownTool,
        "VALIDATION_FAILED" => ValidationFailed,
        "UNAUTHORIZED" => Unauthorized,
        "RATE_LIMITED" => RateLimited,
        "CONFIRMATION_TIMEOUT" => ConfirmationTimeout,
        "CONFIRMATION_DENIED" => ConfirmationDenied,
        "PLUGIN_TIMEOUT" => PluginTimeout,
        "PLUGIN_UNAVAILABLE" => PluginUnavailable,
        "PLUGIN_ERROR" => PluginError,
        "HANDLER_ERROR" => HandlerError,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_row(tool: &str) -> AuditRow {
        AuditRow {
            ts: 1000,
            session: SessionId::new(),
            group: GroupId::new("acme"),
            tool: tool.to_string(),
            correlation: Some(CorrelationId::new()),
            stage: 6,
            code: None,
            duration_ms: 12,
        }
    }

    #[tokio::test]
    async fn records_and_queries_by_tool() {
        let log = AuditLog::open_in_memory().unwrap();
        log.record(sample_row("read_file")).await.unwrap();
        log.record(sample_row("write_file")).await.unwrap();

        let rows = log.by_tool("read_file").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].tool, "read_file");
    }

    #[tokio::test]
    async fn records_and_queries_by_session() {
        let log = AuditLog::open_in_memory().unwrap();
        let row = sample_row("read_file");
        let session = row.session;
        log.record(row).await.unwrap();
        log.record(sample_row("write_file")).await.unwrap();

        let rows = log.by_session(session).await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn records_and_queries_by_time_range() {
        let log = AuditLog::open_in_memory().unwrap();
        let mut early = sample_row("a");
        early.ts = 100;
        let mut late = sample_row("b");
        late.ts = 9000;
        log.record(early).await.unwrap();
        log.record(late).await.unwrap();

        let rows = log.by_time_range(0, 1000).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].tool, "a");
    }

    #[tokio::test]
    async fn never_stores_arguments_or_result_columns() {
        let log = AuditLog::open_in_memory().unwrap();
        log.record(sample_row("read_file")).await.unwrap();
        let conn = log.conn.lock().unwrap();
        let columns: Vec<String> = conn
            .prepare("SELECT * FROM audit")
            .unwrap()
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        assert!(!columns.contains(&"arguments".to_string()));
        assert!(!columns.contains(&"result".to_string()));
    }
}
