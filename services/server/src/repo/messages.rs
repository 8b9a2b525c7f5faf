//! Queries over the `sms_messages` table.

use crate::db::{Store, StoreError};
use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct MessageRow {
    pub id: String,
    pub external_id: String,
    pub sim_port: u16,
    pub sender_number: String,
    pub message_content: String,
    pub received_at: String,
    pub status: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct NewMessage {
    pub external_id: String,
    pub sim_port: u16,
    pub sender_number: String,
    pub message_content: String,
    pub received_at: String,
    pub status: String,
}

#[derive(Debug, Default)]
pub struct MessageFilter {
    pub status: Option<String>,
    pub sim_port: Option<u16>,
    /// Substring match against sender and content.
    pub search: Option<String>,
    pub limit: Option<u32>,
}

/// Insert failing on a duplicate `external_id`.
pub fn insert_message(store: &Store, new: &NewMessage) -> Result<MessageRow, StoreError> {
    let id = Uuid::new_v4().to_string();
    let created_at = super::render_timestamp(Utc::now());
    store.conn.execute(
        "INSERT INTO sms_messages
             (id, external_id, sim_port, sender_number, message_content, received_at, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            id,
            new.external_id,
            new.sim_port,
            new.sender_number,
            new.message_content,
            new.received_at,
            new.status,
            created_at,
        ],
    )?;
    get_by_external_id(store, &new.external_id)?
        .ok_or_else(|| StoreError::InvalidData("inserted row not found".to_owned()))
}

/// Upsert keyed on `external_id`: a replay merges into the existing row,
/// last write wins.
pub fn upsert_message(store: &Store, new: &NewMessage) -> Result<MessageRow, StoreError> {
    let id = Uuid::new_v4().to_string();
    let created_at = super::render_timestamp(Utc::now());
    store.conn.execute(
        "INSERT INTO sms_messages
             (id, external_id, sim_port, sender_number, message_content, received_at, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(external_id) DO UPDATE SET
             sim_port = excluded.sim_port,
             sender_number = excluded.sender_number,
             message_content = excluded.message_content,
             received_at = excluded.received_at",
        params![
            id,
            new.external_id,
            new.sim_port,
            new.sender_number,
            new.message_content,
            new.received_at,
            new.status,
            created_at,
        ],
    )?;
    get_by_external_id(store, &new.external_id)?
        .ok_or_else(|| StoreError::InvalidData("upserted row not found".to_owned()))
}

pub fn get_by_external_id(
    store: &Store,
    external_id: &str,
) -> Result<Option<MessageRow>, StoreError> {
    let mut stmt = store.conn.prepare(
        "SELECT id, external_id, sim_port, sender_number, message_content, received_at, status, created_at
         FROM sms_messages WHERE external_id = ?1",
    )?;
    let mut rows = stmt.query_map(params![external_id], map_message)?;
    match rows.next() {
        Some(row) => Ok(Some(row?)),
        None => Ok(None),
    }
}

pub fn get_by_id(store: &Store, id: &str) -> Result<Option<MessageRow>, StoreError> {
    let mut stmt = store.conn.prepare(
        "SELECT id, external_id, sim_port, sender_number, message_content, received_at, status, created_at
         FROM sms_messages WHERE id = ?1",
    )?;
    let mut rows = stmt.query_map(params![id], map_message)?;
    match rows.next() {
        Some(row) => Ok(Some(row?)),
        None => Ok(None),
    }
}

/// List messages, newest first.
pub fn list_messages(store: &Store, filter: &MessageFilter) -> Result<Vec<MessageRow>, StoreError> {
    let mut sql = String::from(
        "SELECT id, external_id, sim_port, sender_number, message_content, received_at, status, created_at
         FROM sms_messages WHERE 1=1",
    );
    let mut args: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
    if let Some(status) = &filter.status {
        sql.push_str(" AND status = ?");
        args.push(Box::new(status.clone()));
    }
    if let Some(port) = filter.sim_port {
        sql.push_str(" AND sim_port = ?");
        args.push(Box::new(port));
    }
    if let Some(search) = &filter.search {
        sql.push_str(" AND (sender_number LIKE ? OR message_content LIKE ?)");
        let pattern = format!("%{}%", search);
        args.push(Box::new(pattern.clone()));
        args.push(Box::new(pattern));
    }
    sql.push_str(" ORDER BY received_at DESC");
    sql.push_str(" LIMIT ?");
    args.push(Box::new(filter.limit.unwrap_or(100)));

    let mut stmt = store.conn.prepare(&sql)?;
    let rows = stmt.query_map(
        rusqlite::params_from_iter(args.iter().map(|a| a.as_ref())),
        map_message,
    )?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

/// Set the status of one message by storage id. Returns false when no row
/// matched.
pub fn update_status(store: &Store, id: &str, status: &str) -> Result<bool, StoreError> {
    let updated = store.conn.execute(
        "UPDATE sms_messages SET status = ?2 WHERE id = ?1",
        params![id, status],
    )?;
    Ok(updated > 0)
}

pub fn delete_message(store: &Store, id: &str) -> Result<bool, StoreError> {
    let deleted = store
        .conn
        .execute("DELETE FROM sms_messages WHERE id = ?1", params![id])?;
    Ok(deleted > 0)
}

pub fn count_total(store: &Store) -> Result<i64, StoreError> {
    let count = store
        .conn
        .query_row("SELECT COUNT(*) FROM sms_messages", [], |r| r.get(0))?;
    Ok(count)
}

pub fn count_by_status(store: &Store, status: &str) -> Result<i64, StoreError> {
    let count = store.conn.query_row(
        "SELECT COUNT(*) FROM sms_messages WHERE status = ?1",
        params![status],
        |r| r.get(0),
    )?;
    Ok(count)
}

pub fn count_by_port(store: &Store, port: u16) -> Result<i64, StoreError> {
    let count = store.conn.query_row(
        "SELECT COUNT(*) FROM sms_messages WHERE sim_port = ?1",
        params![port],
        |r| r.get(0),
    )?;
    Ok(count)
}

/// (port, received_at) pairs since a cutoff, for analytics aggregation.
/// Rows with unparseable timestamps are skipped.
pub fn received_since(
    store: &Store,
    since: DateTime<Utc>,
) -> Result<Vec<(u16, DateTime<Utc>)>, StoreError> {
    let mut stmt = store.conn.prepare(
        "SELECT sim_port, received_at FROM sms_messages WHERE received_at >= ?1",
    )?;
    let rows = stmt.query_map(params![super::render_timestamp(since)], |row| {
        Ok((row.get::<_, u16>(0)?, row.get::<_, String>(1)?))
    })?;
    let mut out = Vec::new();
    for row in rows {
        let (port, raw) = row?;
        if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
            out.push((port, ts.with_timezone(&Utc)));
        }
    }
    Ok(out)
}

fn map_message(row: &rusqlite::Row<'_>) -> Result<MessageRow, rusqlite::Error> {
    Ok(MessageRow {
        id: row.get(0)?,
        external_id: row.get(1)?,
        sim_port: row.get(2)?,
        sender_number: row.get(3)?,
        message_content: row.get(4)?,
        received_at: row.get(5)?,
        status: row.get(6)?,
        created_at: row.get(7)?,
    })
}
