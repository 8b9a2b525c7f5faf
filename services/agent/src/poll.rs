//! One poll cycle: read every configured port, push what is new.
//!
//! A cycle never aborts early. A port that fails to answer is counted and
//! skipped; the remaining ports still get polled, and per-message push
//! failures leave the message unrecorded so the next cycle retries it.

use chrono::Utc;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::dedup::SeenIds;
use crate::gateway::GatewayClient;
use crate::sync::{PortStatusPatch, SyncClient};
use sms_core::normalize::{normalize_message, vendor_id};

/// Summary of one completed cycle, as exposed on the status endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleOutcome {
    pub ports_polled: usize,
    pub new_messages: usize,
    pub failed_ports: usize,
    /// New messages stored this cycle, per port.
    pub per_port: Vec<(u16, usize)>,
    /// Datastore writes attempted and failed, for reachability reporting.
    pub sync_attempts: usize,
    pub sync_failures: usize,
}

/// Poll every port once, in order.
pub async fn run_cycle(
    ports: &[u16],
    gateway: &GatewayClient,
    sync: &SyncClient,
    seen: &mut SeenIds,
    acknowledge: bool,
) -> CycleOutcome {
    let mut outcome = CycleOutcome {
        ports_polled: ports.len(),
        ..CycleOutcome::default()
    };

    for &port in ports {
        // Status first: it doubles as the liveness signal for the port.
        match gateway.fetch_status(port).await {
            Some(status) => {
                let patch = PortStatusPatch {
                    last_seen_at: Utc::now(),
                    signal_strength: status.signal_strength,
                    carrier: status.carrier,
                };
                outcome.sync_attempts += 1;
                if let Err(e) = sync.patch_port_status(port, &patch).await {
                    outcome.sync_failures += 1;
                    warn!(port = %port, error = %e, "failed to sync port status");
                }
            }
            None => {
                debug!(port = %port, "port did not answer status read");
                outcome.failed_ports += 1;
            }
        }

        let raw_messages = gateway.fetch_messages(port).await;
        let mut acked_ids: Vec<String> = Vec::new();
        let mut port_new = 0usize;
        for raw in &raw_messages {
            let message = normalize_message(raw, port, Utc::now());
            if seen.seen(&message.external_id) {
                continue;
            }
            outcome.sync_attempts += 1;
            match sync.push_message(&message).await {
                Ok(()) => {
                    seen.record(&message.external_id);
                    outcome.new_messages += 1;
                    port_new += 1;
                    if acknowledge {
                        if let Some(id) = vendor_id(raw) {
                            acked_ids.push(id);
                        }
                    }
                }
                Err(e) => {
                    // Not recorded as seen, so the next cycle retries.
                    outcome.sync_failures += 1;
                    warn!(port = %port, external_id = %message.external_id, error = %e,
                        "failed to push message");
                }
            }
        }
        outcome.per_port.push((port, port_new));

        if !acked_ids.is_empty() && gateway.acknowledge(port, &acked_ids).await {
            debug!(port = %port, count = acked_ids.len(), "acknowledged delivered messages");
        }
    }

    if outcome.new_messages > 0 {
        info!(
            new_messages = outcome.new_messages,
            ports_polled = outcome.ports_polled,
            failed_ports = outcome.failed_ports,
            "poll cycle stored new messages"
        );
        let entry = crate::sync::ActivityLogEntry {
            event_type: "sms_received".to_owned(),
            message: format!("Stored {} new message(s)", outcome.new_messages),
            severity: "info".to_owned(),
            metadata: Some(json!({
                "ports_polled": outcome.ports_polled,
                "failed_ports": outcome.failed_ports,
            })),
        };
        if let Err(e) = sync.append_log(&entry).await {
            debug!(error = %e, "failed to append activity log");
        }
    } else {
        debug!(
            ports_polled = outcome.ports_polled,
            failed_ports = outcome.failed_ports,
            "poll cycle found nothing new"
        );
    }

    outcome
}
