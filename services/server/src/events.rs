//! Change notifications broadcast to dashboard clients.
//!
//! Every mutating endpoint emits one event naming the touched table; SSE
//! subscribers re-fetch the affected resource. Lagged subscribers receive a
//! `resync` event and are expected to re-fetch everything.

use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChangeEvent {
    Resync,
    MessagesChanged { op: ChangeOp },
    PortsChanged { op: ChangeOp },
    LogsChanged,
    ConfigChanged { table: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOp {
    Insert,
    Update,
    Delete,
}

impl ChangeEvent {
    /// SSE event name for this variant.
    pub fn event_name(&self) -> &'static str {
        match self {
            ChangeEvent::Resync => "resync",
            ChangeEvent::MessagesChanged { .. } => "messages_changed",
            ChangeEvent::PortsChanged { .. } => "ports_changed",
            ChangeEvent::LogsChanged => "logs_changed",
            ChangeEvent::ConfigChanged { .. } => "config_changed",
        }
    }
}
