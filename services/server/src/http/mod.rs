pub mod configs;
pub mod import;
pub mod logs;
pub mod messages;
pub mod ports;
pub mod response;
pub mod sse;
pub mod stats;

/// Extract a PostgREST-style equality filter (`column=eq.value`) from a raw
/// query string.
pub(crate) fn eq_filter(query: &str, column: &str) -> Option<String> {
    let prefix = format!("{}=eq.", column);
    query
        .split('&')
        .find_map(|pair| pair.strip_prefix(prefix.as_str()))
        .map(str::to_owned)
}

/// Extract a plain `key=value` query parameter.
pub(crate) fn query_param(query: &str, key: &str) -> Option<String> {
    let prefix = format!("{}=", key);
    query
        .split('&')
        .find_map(|pair| pair.strip_prefix(prefix.as_str()))
        .map(str::to_owned)
}

/// Parse a client-supplied RFC 3339 timestamp and re-render it in the one
/// form every writer stores: UTC, microsecond precision, `Z` suffix.
/// Timestamps live in TEXT columns and are ordered and range-compared
/// lexicographically, so mixed renderings (`Z` vs `+00:00`, varying
/// subsecond digits) would sort wrong.
pub(crate) fn canonical_timestamp(raw: &str) -> Option<String> {
    chrono::DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| crate::repo::render_timestamp(dt.with_timezone(&chrono::Utc)))
}
