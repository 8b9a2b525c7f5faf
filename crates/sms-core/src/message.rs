//! Canonical SMS message model.
//!
//! A message is immutable once stored except for `status` transitions made
//! through the dashboard. `external_id` is the deduplication key: either the
//! vendor-supplied message id or a synthesized composite (see
//! [`crate::normalize`]). Uniqueness is enforced by upsert semantics at the
//! storage layer, not here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// MessageStatus
// ---------------------------------------------------------------------------

/// Read-state of a stored message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Unread,
    Read,
    Processed,
}

impl MessageStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageStatus::Unread => "unread",
            MessageStatus::Read => "read",
            MessageStatus::Processed => "processed",
        }
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageStatus {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unread" => Ok(MessageStatus::Unread),
            "read" => Ok(MessageStatus::Read),
            "processed" => Ok(MessageStatus::Processed),
            _ => Err("invalid message status"),
        }
    }
}

// ---------------------------------------------------------------------------
// SmsMessage
// ---------------------------------------------------------------------------

/// A normalized SMS message, ready to be pushed to the datastore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmsMessage {
    /// Dedup key: vendor id or synthesized composite.
    pub external_id: String,
    /// SIM slot (1..N) the message arrived on.
    pub sim_port: u16,
    pub sender_number: String,
    pub message_content: String,
    pub received_at: DateTime<Utc>,
    pub status: MessageStatus,
}
