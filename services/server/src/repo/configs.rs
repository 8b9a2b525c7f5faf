//! Singleton config rows: gateway connection settings and PBX mapping.

use crate::db::{Store, StoreError};
use chrono::Utc;
use rusqlite::params;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigTable {
    Gateway,
    Pbx,
}

impl ConfigTable {
    pub fn table_name(self) -> &'static str {
        match self {
            ConfigTable::Gateway => "gateway_config",
            ConfigTable::Pbx => "pbx_config",
        }
    }
}

pub fn get_config(store: &Store, table: ConfigTable) -> Result<Option<Value>, StoreError> {
    let sql = format!("SELECT config FROM {} WHERE id = 1", table.table_name());
    let mut stmt = store.conn.prepare(&sql)?;
    let mut rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
    match rows.next() {
        Some(row) => {
            let raw = row?;
            let value = serde_json::from_str(&raw)
                .map_err(|e| StoreError::InvalidData(format!("stored config not JSON: {}", e)))?;
            Ok(Some(value))
        }
        None => Ok(None),
    }
}

/// Replace the singleton config row.
pub fn put_config(store: &Store, table: ConfigTable, config: &Value) -> Result<(), StoreError> {
    let raw = serde_json::to_string(config)
        .map_err(|e| StoreError::InvalidData(format!("unserializable config: {}", e)))?;
    let sql = format!(
        "INSERT INTO {} (id, config, updated_at) VALUES (1, ?1, ?2)
         ON CONFLICT(id) DO UPDATE SET config = excluded.config, updated_at = excluded.updated_at",
        table.table_name()
    );
    store
        .conn
        .execute(&sql, params![raw, super::render_timestamp(Utc::now())])?;
    Ok(())
}
