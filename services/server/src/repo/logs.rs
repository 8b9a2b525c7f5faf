//! Queries over the append-only `activity_logs` table.

use crate::db::{Store, StoreError};
use chrono::Utc;
use rusqlite::params;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

/// Event types written by polling agents; agent liveness is inferred from
/// the newest row carrying one of these.
pub const AGENT_EVENT_TYPES: &[&str] = &["connection_test", "sms_received", "agent_poll"];

#[derive(Debug, Clone, Serialize)]
pub struct LogRow {
    pub id: String,
    pub event_type: String,
    pub message: String,
    pub severity: String,
    pub metadata: Option<Value>,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct NewLog {
    pub event_type: String,
    pub message: String,
    pub severity: String,
    pub metadata: Option<Value>,
}

pub fn append_log(store: &Store, new: &NewLog) -> Result<LogRow, StoreError> {
    let id = Uuid::new_v4().to_string();
    let created_at = super::render_timestamp(Utc::now());
    let metadata = match &new.metadata {
        Some(v) => Some(serde_json::to_string(v).map_err(|e| {
            StoreError::InvalidData(format!("unserializable log metadata: {}", e))
        })?),
        None => None,
    };
    store.conn.execute(
        "INSERT INTO activity_logs (id, event_type, message, severity, metadata, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![id, new.event_type, new.message, new.severity, metadata, created_at],
    )?;
    Ok(LogRow {
        id,
        event_type: new.event_type.clone(),
        message: new.message.clone(),
        severity: new.severity.clone(),
        metadata: new.metadata.clone(),
        created_at,
    })
}

/// Newest entries first.
pub fn recent_logs(store: &Store, limit: u32) -> Result<Vec<LogRow>, StoreError> {
    let mut stmt = store.conn.prepare(
        "SELECT id, event_type, message, severity, metadata, created_at
         FROM activity_logs ORDER BY created_at DESC LIMIT ?1",
    )?;
    let rows = stmt.query_map(params![limit], map_log)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

/// Timestamp of the newest agent-originated log entry, if any.
pub fn latest_agent_activity(store: &Store) -> Result<Option<String>, StoreError> {
    let placeholders = AGENT_EVENT_TYPES
        .iter()
        .map(|_| "?")
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "SELECT created_at FROM activity_logs WHERE event_type IN ({})
         ORDER BY created_at DESC LIMIT 1",
        placeholders
    );
    let mut stmt = store.conn.prepare(&sql)?;
    let mut rows = stmt.query_map(
        rusqlite::params_from_iter(AGENT_EVENT_TYPES.iter()),
        |row| row.get::<_, String>(0),
    )?;
    match rows.next() {
        Some(row) => Ok(Some(row?)),
        None => Ok(None),
    }
}

fn map_log(row: &rusqlite::Row<'_>) -> Result<LogRow, rusqlite::Error> {
    let metadata: Option<String> = row.get(4)?;
    Ok(LogRow {
        id: row.get(0)?,
        event_type: row.get(1)?,
        message: row.get(2)?,
        severity: row.get(3)?,
        metadata: metadata.and_then(|s| serde_json::from_str(&s).ok()),
        created_at: row.get(5)?,
    })
}
