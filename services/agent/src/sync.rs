//! Datastore REST client.
//!
//! The datastore speaks a PostgREST-flavoured API: table-per-path resources,
//! upsert via `?on_conflict=` plus a `Prefer: resolution=merge-duplicates`
//! header, filters as `column=eq.value` query pairs. Both the `apikey` header
//! and a bearer token carry the same key.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sms_core::SmsMessage;
use std::time::Duration;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("datastore transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("datastore rejected request: {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
}

/// Fields patched onto `sim_port_config` after each status read.
#[derive(Debug, Serialize)]
pub struct PortStatusPatch {
    pub last_seen_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signal_strength: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub carrier: Option<String>,
}

/// One row for the `activity_logs` table.
#[derive(Debug, Serialize)]
pub struct ActivityLogEntry {
    pub event_type: String,
    pub message: String,
    pub severity: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

pub struct SyncClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl SyncClient {
    pub fn new(
        base_url: &str,
        api_key: &str,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_owned(),
            api_key: api_key.to_owned(),
        })
    }

    /// Upsert one message by external id. Replays of an already-stored id
    /// merge into the existing row instead of erroring.
    pub async fn push_message(&self, message: &SmsMessage) -> Result<(), SyncError> {
        let url = format!(
            "{}/rest/v1/sms_messages?on_conflict=external_id",
            self.base_url
        );
        let resp = self
            .http
            .post(&url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Prefer", "resolution=merge-duplicates")
            .json(message)
            .send()
            .await?;
        check_status(resp).await
    }

    /// Patch one port's liveness fields on `sim_port_config`.
    pub async fn patch_port_status(
        &self,
        port: u16,
        patch: &PortStatusPatch,
    ) -> Result<(), SyncError> {
        let url = format!(
            "{}/rest/v1/sim_port_config?port_number=eq.{}",
            self.base_url, port
        );
        let resp = self
            .http
            .patch(&url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .json(patch)
            .send()
            .await?;
        check_status(resp).await
    }

    /// Append one activity log row.
    pub async fn append_log(&self, entry: &ActivityLogEntry) -> Result<(), SyncError> {
        let url = format!("{}/rest/v1/activity_logs", self.base_url);
        let resp = self
            .http
            .post(&url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .json(entry)
            .send()
            .await?;
        check_status(resp).await
    }
}

async fn check_status(resp: reqwest::Response) -> Result<(), SyncError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(());
    }
    let body = resp.text().await.unwrap_or_default();
    Err(SyncError::Status { status, body })
}
