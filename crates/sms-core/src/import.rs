//! Manual bulk-import parsing.
//!
//! The dashboard's import box accepts either a JSON array of
//! `{sender_number, message_content, sim_port}` objects (a single object is
//! also accepted) or CSV with columns `sender,content,port` and an optional
//! header row. JSON is tried first; anything that fails JSON parsing falls
//! back to the CSV path.

use serde::{Deserialize, Serialize};

/// One parsed import row, before external id assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportedMessage {
    pub sender_number: String,
    pub message_content: String,
    pub sim_port: u16,
}

#[derive(Debug, PartialEq, Eq)]
pub enum ImportError {
    Empty,
    NoValidRows,
}

impl std::fmt::Display for ImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportError::Empty => write!(f, "no data to import"),
            ImportError::NoValidRows => write!(f, "no valid messages found in data"),
        }
    }
}

impl std::error::Error for ImportError {}

/// Parse a pasted bulk payload into import rows.
///
/// Rows with empty content are dropped. A missing port defaults to 1; a
/// missing sender becomes `Unknown-{row index}`.
pub fn parse_bulk(input: &str) -> Result<Vec<ImportedMessage>, ImportError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ImportError::Empty);
    }

    let rows = match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(value) => parse_json(value),
        Err(_) => parse_csv(trimmed),
    };

    let rows: Vec<ImportedMessage> = rows
        .into_iter()
        .filter(|m| !m.message_content.is_empty())
        .collect();
    if rows.is_empty() {
        return Err(ImportError::NoValidRows);
    }
    Ok(rows)
}

fn parse_json(value: serde_json::Value) -> Vec<ImportedMessage> {
    let items = match value {
        serde_json::Value::Array(items) => items,
        single => vec![single],
    };
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| ImportedMessage {
            sender_number: item
                .get("sender_number")
                .and_then(|v| v.as_str())
                .map(str::to_owned)
                .unwrap_or_else(|| format!("Unknown-{i}")),
            message_content: item
                .get("message_content")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_owned(),
            sim_port: item
                .get("sim_port")
                .and_then(serde_json::Value::as_u64)
                .and_then(|p| u16::try_from(p).ok())
                .unwrap_or(1),
        })
        .collect()
}

fn parse_csv(input: &str) -> Vec<ImportedMessage> {
    let lines: Vec<&str> = input.lines().collect();
    let has_header = lines
        .first()
        .map(|l| {
            let lower = l.to_lowercase();
            lower.contains("sender") || lower.contains("number")
        })
        .unwrap_or(false);

    let data_lines = if has_header { &lines[1..] } else { &lines[..] };

    data_lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let parts: Vec<String> = line.split(',').map(strip_quotes).collect();
            ImportedMessage {
                sender_number: parts
                    .first()
                    .filter(|s| !s.is_empty())
                    .cloned()
                    .unwrap_or_else(|| format!("Unknown-{i}")),
                message_content: parts.get(1).cloned().unwrap_or_default(),
                sim_port: parts
                    .get(2)
                    .and_then(|p| p.parse::<u16>().ok())
                    .unwrap_or(1),
            }
        })
        .collect()
}

/// Trim whitespace and one layer of surrounding single or double quotes.
fn strip_quotes(s: &str) -> String {
    let s = s.trim();
    let s = s.strip_prefix(['"', '\'']).unwrap_or(s);
    let s = s.strip_suffix(['"', '\'']).unwrap_or(s);
    s.to_owned()
}
