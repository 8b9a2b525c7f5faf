//! Vendor response normalization.
//!
//! The gateway's HTTP API varies by firmware version: the message list may
//! live under `messages`, `sms`, `data`, or `inbox` (or be the top-level
//! array), and each record spells its fields differently. The decoder is a
//! sequence of named field-extraction chains, each an explicit ordered list
//! tried first-match-wins, so the fallback order stays auditable in one
//! place rather than scattered through `||` expressions.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::message::{MessageStatus, SmsMessage};

// ---------------------------------------------------------------------------
// Fallback chains
// ---------------------------------------------------------------------------

/// Envelope keys that may hold the message array, in probe order.
pub const ENVELOPE_KEYS: &[&str] = &["messages", "sms", "data", "inbox"];

/// Vendor id field names, in probe order.
const ID_FIELDS: &[&str] = &["id", "message_id", "msgid"];

/// Sender field names, in probe order.
const SENDER_FIELDS: &[&str] = &["from", "sender", "number"];

/// Body field names, in probe order.
const CONTENT_FIELDS: &[&str] = &["text", "content", "message"];

/// Timestamp field names, in probe order.
const TIMESTAMP_FIELDS: &[&str] = &["time", "received_at", "timestamp", "date"];

/// How many leading content characters participate in a synthesized id.
const SYNTH_ID_CONTENT_PREFIX: usize = 20;

/// Extract the message array from a vendor response envelope.
///
/// Returns `None` when the body matches no known shape — the caller treats
/// that as "this endpoint candidate did not answer in a recognized dialect"
/// and moves on to the next candidate.
pub fn extract_messages(body: &Value) -> Option<Vec<Value>> {
    if let Some(arr) = body.as_array() {
        return Some(arr.clone());
    }
    for key in ENVELOPE_KEYS {
        if let Some(arr) = body.get(*key).and_then(Value::as_array) {
            return Some(arr.clone());
        }
    }
    None
}

/// First-match-wins string extraction across a field chain.
///
/// Numbers are accepted and stringified (some firmwares report the sender as
/// a bare number).
fn first_string(raw: &Value, fields: &[&str]) -> Option<String> {
    for field in fields {
        match raw.get(*field) {
            Some(Value::String(s)) if !s.is_empty() => return Some(s.clone()),
            Some(Value::Number(n)) => return Some(n.to_string()),
            _ => {}
        }
    }
    None
}

/// Parse a vendor timestamp, accepting RFC 3339 or `YYYY-MM-DD HH:MM:SS`.
fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

/// The vendor-native id of a raw record, if it carries one.
///
/// Acknowledging a message back to the gateway requires the id the gateway
/// itself assigned; synthesized ids mean nothing to it.
pub fn vendor_id(raw: &Value) -> Option<String> {
    first_string(raw, ID_FIELDS)
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Map a raw vendor record to the canonical message shape.
///
/// Missing fields fall back to defaults (sender "Unknown", empty content,
/// `now` for the timestamp) rather than rejecting the record. `now` is
/// injected so the function stays deterministic under test.
pub fn normalize_message(raw: &Value, port: u16, now: DateTime<Utc>) -> SmsMessage {
    let sender = first_string(raw, SENDER_FIELDS).unwrap_or_else(|| "Unknown".to_owned());
    let content = first_string(raw, CONTENT_FIELDS).unwrap_or_default();
    let raw_timestamp = first_string(raw, TIMESTAMP_FIELDS);
    let received_at = raw_timestamp
        .as_deref()
        .and_then(parse_timestamp)
        .unwrap_or(now);

    let external_id = match first_string(raw, ID_FIELDS) {
        Some(id) => id,
        None => synthesize_external_id(
            port,
            &sender,
            raw_timestamp.as_deref().unwrap_or(&now.to_rfc3339()),
            &content,
        ),
    };

    SmsMessage {
        external_id,
        sim_port: port,
        sender_number: sender,
        message_content: content,
        received_at,
        status: MessageStatus::Unread,
    }
}

/// Synthesize a dedup id for records lacking any vendor id field.
///
/// Composite of port, sender, raw timestamp, and the first
/// [`SYNTH_ID_CONTENT_PREFIX`] characters of the content. Deterministic for
/// identical inputs within one process; a known-weak heuristic, not a
/// sequence guarantee — distinct messages with identical sender, time, and
/// content prefix collide.
pub fn synthesize_external_id(port: u16, sender: &str, timestamp: &str, content: &str) -> String {
    let prefix: String = content.chars().take(SYNTH_ID_CONTENT_PREFIX).collect();
    format!("{port}-{sender}-{timestamp}-{prefix}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn test_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    // -----------------------------------------------------------------------
    // Envelope extraction
    // -----------------------------------------------------------------------

    #[test]
    fn extracts_each_known_envelope_key() {
        for key in ENVELOPE_KEYS {
            let body = json!({ *key: [{"id": "m1"}] });
            let msgs = extract_messages(&body).expect("should find array");
            assert_eq!(msgs.len(), 1, "envelope key {key}");
        }
    }

    #[test]
    fn extracts_top_level_array() {
        let body = json!([{"id": "m1"}, {"id": "m2"}]);
        assert_eq!(extract_messages(&body).unwrap().len(), 2);
    }

    #[test]
    fn envelope_keys_probe_in_declared_order() {
        let body = json!({ "sms": [{"id": "from-sms"}], "messages": [{"id": "from-messages"}] });
        let msgs = extract_messages(&body).unwrap();
        assert_eq!(msgs[0]["id"], "from-messages");
    }

    #[test]
    fn unknown_shape_yields_none() {
        assert!(extract_messages(&json!({"status": "ok"})).is_none());
        assert!(extract_messages(&json!("nope")).is_none());
    }

    // -----------------------------------------------------------------------
    // Field fallback chains
    // -----------------------------------------------------------------------

    #[test]
    fn vendor_id_wins_over_synthesis() {
        let raw = json!({"id": "vendor-1", "from": "+1555", "text": "hi"});
        let msg = normalize_message(&raw, 1, test_now());
        assert_eq!(msg.external_id, "vendor-1");
    }

    #[test]
    fn message_id_and_msgid_are_accepted() {
        let msg = normalize_message(&json!({"message_id": "m-2"}), 1, test_now());
        assert_eq!(msg.external_id, "m-2");
        let msg = normalize_message(&json!({"msgid": "m-3"}), 1, test_now());
        assert_eq!(msg.external_id, "m-3");
    }

    #[test]
    fn sender_fallback_chain() {
        let msg = normalize_message(&json!({"sender": "+1555"}), 1, test_now());
        assert_eq!(msg.sender_number, "+1555");
        let msg = normalize_message(&json!({"number": 15551234}), 1, test_now());
        assert_eq!(msg.sender_number, "15551234");
        let msg = normalize_message(&json!({}), 1, test_now());
        assert_eq!(msg.sender_number, "Unknown");
    }

    #[test]
    fn content_fallback_chain_defaults_empty() {
        let msg = normalize_message(&json!({"content": "body"}), 1, test_now());
        assert_eq!(msg.message_content, "body");
        let msg = normalize_message(&json!({}), 1, test_now());
        assert_eq!(msg.message_content, "");
    }

    #[test]
    fn timestamp_parses_rfc3339_and_sql_style() {
        let msg = normalize_message(
            &json!({"time": "2026-02-01T08:30:00Z", "id": "a"}),
            1,
            test_now(),
        );
        assert_eq!(
            msg.received_at,
            Utc.with_ymd_and_hms(2026, 2, 1, 8, 30, 0).unwrap()
        );

        let msg = normalize_message(
            &json!({"date": "2026-02-01 08:30:00", "id": "a"}),
            1,
            test_now(),
        );
        assert_eq!(
            msg.received_at,
            Utc.with_ymd_and_hms(2026, 2, 1, 8, 30, 0).unwrap()
        );
    }

    #[test]
    fn unparseable_timestamp_falls_back_to_now() {
        let msg = normalize_message(&json!({"time": "yesterday-ish", "id": "a"}), 1, test_now());
        assert_eq!(msg.received_at, test_now());
    }

    #[test]
    fn new_messages_start_unread() {
        let msg = normalize_message(&json!({"id": "a"}), 3, test_now());
        assert_eq!(msg.status, MessageStatus::Unread);
        assert_eq!(msg.sim_port, 3);
    }

    // -----------------------------------------------------------------------
    // Synthesized ids
    // -----------------------------------------------------------------------

    #[test]
    fn synthesized_id_is_deterministic() {
        let raw = json!({"from": "+1555", "text": "Hello world", "time": "2026-02-01T08:30:00Z"});
        let a = normalize_message(&raw, 2, test_now());
        let b = normalize_message(&raw, 2, test_now());
        assert_eq!(a.external_id, b.external_id);
        assert_eq!(a.external_id, "2-+1555-2026-02-01T08:30:00Z-Hello world");
    }

    #[test]
    fn synthesized_id_truncates_content_to_twenty_chars() {
        let id = synthesize_external_id(1, "+1555", "t", "abcdefghijklmnopqrstuvwxyz");
        assert!(id.ends_with("abcdefghijklmnopqrst"));
        assert!(!id.contains('u'));
    }

    #[test]
    fn synthesized_id_differs_per_port() {
        let raw = json!({"from": "+1555", "text": "hi", "time": "t"});
        let a = normalize_message(&raw, 1, test_now());
        let b = normalize_message(&raw, 2, test_now());
        assert_ne!(a.external_id, b.external_id);
    }
}
