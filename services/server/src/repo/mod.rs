pub mod configs;
pub mod logs;
pub mod messages;
pub mod ports;

use chrono::{DateTime, SecondsFormat, Utc};

/// Timestamps live in TEXT columns and are ordered and range-compared
/// lexicographically, so every writer and every cutoff uses this one
/// rendering: UTC, microsecond precision, `Z` suffix.
pub(crate) fn render_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}
