//! Queries over the `sim_port_config` table.

use crate::db::{Store, StoreError};
use rusqlite::params;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct PortRow {
    pub id: String,
    pub port_number: u16,
    pub extension: Option<String>,
    pub label: Option<String>,
    pub enabled: bool,
    pub phone_number: Option<String>,
    pub carrier: Option<String>,
    pub signal_strength: Option<i64>,
    pub last_seen_at: Option<String>,
}

/// Patch for one port row. `None` means leave the column unchanged.
#[derive(Debug, Default)]
pub struct PortPatch {
    pub extension: Option<String>,
    pub label: Option<String>,
    pub enabled: Option<bool>,
    pub phone_number: Option<String>,
    pub carrier: Option<String>,
    pub signal_strength: Option<i64>,
    pub last_seen_at: Option<String>,
}

impl PortPatch {
    pub fn is_empty(&self) -> bool {
        self.extension.is_none()
            && self.label.is_none()
            && self.enabled.is_none()
            && self.phone_number.is_none()
            && self.carrier.is_none()
            && self.signal_strength.is_none()
            && self.last_seen_at.is_none()
    }
}

pub fn list_ports(store: &Store) -> Result<Vec<PortRow>, StoreError> {
    let mut stmt = store.conn.prepare(
        "SELECT id, port_number, extension, label, enabled, phone_number, carrier,
                signal_strength, last_seen_at
         FROM sim_port_config ORDER BY port_number ASC",
    )?;
    let rows = stmt.query_map([], map_port)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn get_port(store: &Store, port_number: u16) -> Result<Option<PortRow>, StoreError> {
    let mut stmt = store.conn.prepare(
        "SELECT id, port_number, extension, label, enabled, phone_number, carrier,
                signal_strength, last_seen_at
         FROM sim_port_config WHERE port_number = ?1",
    )?;
    let mut rows = stmt.query_map(params![port_number], map_port)?;
    match rows.next() {
        Some(row) => Ok(Some(row?)),
        None => Ok(None),
    }
}

/// Apply a partial update to one port row. Returns false when the port does
/// not exist; an empty patch is an error.
pub fn patch_port(store: &Store, port_number: u16, patch: &PortPatch) -> Result<bool, StoreError> {
    if patch.is_empty() {
        return Err(StoreError::InvalidData("empty port patch".to_owned()));
    }

    let mut sets: Vec<&str> = Vec::new();
    let mut args: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
    if let Some(v) = &patch.extension {
        sets.push("extension = ?");
        args.push(Box::new(v.clone()));
    }
    if let Some(v) = &patch.label {
        sets.push("label = ?");
        args.push(Box::new(v.clone()));
    }
    if let Some(v) = patch.enabled {
        sets.push("enabled = ?");
        args.push(Box::new(v));
    }
    if let Some(v) = &patch.phone_number {
        sets.push("phone_number = ?");
        args.push(Box::new(v.clone()));
    }
    if let Some(v) = &patch.carrier {
        sets.push("carrier = ?");
        args.push(Box::new(v.clone()));
    }
    if let Some(v) = patch.signal_strength {
        sets.push("signal_strength = ?");
        args.push(Box::new(v));
    }
    if let Some(v) = &patch.last_seen_at {
        sets.push("last_seen_at = ?");
        args.push(Box::new(v.clone()));
    }

    let sql = format!(
        "UPDATE sim_port_config SET {} WHERE port_number = ?",
        sets.join(", ")
    );
    args.push(Box::new(port_number));

    let updated = store.conn.execute(
        &sql,
        rusqlite::params_from_iter(args.iter().map(|a| a.as_ref())),
    )?;
    Ok(updated > 0)
}

fn map_port(row: &rusqlite::Row<'_>) -> Result<PortRow, rusqlite::Error> {
    Ok(PortRow {
        id: row.get(0)?,
        port_number: row.get(1)?,
        extension: row.get(2)?,
        label: row.get(3)?,
        enabled: row.get(4)?,
        phone_number: row.get(5)?,
        carrier: row.get(6)?,
        signal_strength: row.get(7)?,
        last_seen_at: row.get(8)?,
    })
}
