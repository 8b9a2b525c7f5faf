//! Embedded SQLite store for the datastore service.
//!
//! # Schema
//! - `sms_messages`: canonical messages, `external_id` unique (upsert target).
//! - `sim_port_config`: one row per SIM port; ports 1-4 seeded at first open.
//! - `activity_logs`: append-only event feed.
//! - `gateway_config` / `pbx_config`: singleton JSON config rows.
//!
//! # SQLite settings
//! Applied at open: WAL, synchronous=FULL, foreign_keys=ON.
//! PRAGMA integrity_check runs at open; returns error if it fails.

use rusqlite::{Connection, params};
use std::path::Path;

/// Ports seeded into `sim_port_config` on first open.
const SEED_PORTS: [u16; 4] = [1, 2, 3, 4];

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum StoreError {
    Sqlite(rusqlite::Error),
    IntegrityCheckFailed(String),
    InvalidData(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Sqlite(e) => write!(f, "SQLite error: {}", e),
            StoreError::IntegrityCheckFailed(s) => write!(f, "Integrity check failed: {}", s),
            StoreError::InvalidData(s) => write!(f, "Invalid data: {}", s),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Sqlite(e)
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// The embedded store for a single server instance.
pub struct Store {
    pub(crate) conn: Connection,
}

impl Store {
    /// Open (or create) the store at the given path.
    ///
    /// Applies PRAGMAs, runs `PRAGMA integrity_check`, creates tables if
    /// needed, and seeds the default port rows.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// Open an in-memory store. For tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        apply_pragmas(&conn)?;
        run_integrity_check(&conn)?;
        apply_schema(&conn)?;
        seed_ports(&conn)?;
        Ok(Store { conn })
    }
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn apply_pragmas(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "PRAGMA journal_mode=WAL;
         PRAGMA synchronous=FULL;
         PRAGMA foreign_keys=ON;",
    )?;
    Ok(())
}

fn run_integrity_check(conn: &Connection) -> Result<(), StoreError> {
    let result: String = conn.pragma_query_value(None, "integrity_check", |row| row.get(0))?;
    if result != "ok" {
        return Err(StoreError::IntegrityCheckFailed(result));
    }
    Ok(())
}

fn apply_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(include_str!("schema.sql"))?;
    Ok(())
}

fn seed_ports(conn: &Connection) -> Result<(), StoreError> {
    for port in SEED_PORTS {
        conn.execute(
            "INSERT OR IGNORE INTO sim_port_config (id, port_number, label, enabled)
             VALUES (?1, ?2, ?3, 1)",
            params![
                uuid::Uuid::new_v4().to_string(),
                port,
                format!("SIM {}", port)
            ],
        )?;
    }
    Ok(())
}
