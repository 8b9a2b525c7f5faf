//! The poll loop.
//!
//! One task owns the dedup set and runs cycles strictly sequentially, so two
//! cycles can never overlap no matter how slow the gateway is. The interval
//! uses `MissedTickBehavior::Skip`: a cycle that outlasts the interval simply
//! absorbs the missed ticks instead of queueing a burst of catch-up cycles.
//!
//! Manual triggers arrive on a capacity-1 channel; at most one trigger can be
//! pending while a cycle runs, further requests are refused at the HTTP layer.

use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info};

use crate::dedup::SeenIds;
use crate::gateway::GatewayClient;
use crate::poll::run_cycle;
use crate::status_http::StatusServer;
use crate::sync::SyncClient;

pub struct PollLoop {
    pub ports: Vec<u16>,
    pub interval_secs: u64,
    pub acknowledge: bool,
    pub gateway: Arc<GatewayClient>,
    pub sync: Arc<SyncClient>,
    pub status: StatusServer,
    pub seen: Arc<Mutex<SeenIds>>,
}

impl PollLoop {
    pub async fn run(
        self,
        mut trigger_rx: mpsc::Receiver<()>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        let mut ticker = interval(Duration::from_secs(self.interval_secs));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.cycle("interval").await;
                }
                Some(()) = trigger_rx.recv() => {
                    self.cycle("manual").await;
                }
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("poll loop stopping (shutdown)");
                        return;
                    }
                }
            }
        }
    }

    async fn cycle(&self, reason: &str) {
        debug!(reason = %reason, "starting poll cycle");
        self.status.set_cycle_running(true).await;
        let mut seen = self.seen.lock().await;
        let outcome = run_cycle(
            &self.ports,
            &self.gateway,
            &self.sync,
            &mut seen,
            self.acknowledge,
        )
        .await;
        let seen_len = seen.len();
        drop(seen);
        self.status
            .set_gateway_reachable(outcome.failed_ports < outcome.ports_polled)
            .await;
        if outcome.sync_attempts > 0 {
            self.status
                .set_datastore_reachable(outcome.sync_failures < outcome.sync_attempts)
                .await;
        }
        self.status.record_cycle(outcome, seen_len).await;
        self.status.set_cycle_running(false).await;
    }
}
