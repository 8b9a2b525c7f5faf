//! Health classification for SIM ports and the polling agent.
//!
//! Both classifiers are pure functions over (config row, now) so the
//! dashboard and the tests share one source of truth for the thresholds.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Port is "online" only if last seen within this window.
const PORT_FRESH_WINDOW_MINS: i64 = 5;
/// Beyond this window the port is flatly offline.
const PORT_STALE_WINDOW_MINS: i64 = 30;
/// Signal strength below this (0..100) downgrades a fresh port to warning.
const PORT_MIN_SIGNAL: i64 = 50;

/// Agent is "online" if it logged activity within this many seconds.
const AGENT_ONLINE_SECS: i64 = 120;
/// Agent is "warning" up to this many seconds; offline after.
const AGENT_WARNING_SECS: i64 = 300;

/// Derived health state, shared by ports and the agent indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Health {
    Online,
    Warning,
    Offline,
}

impl Health {
    pub fn as_str(self) -> &'static str {
        match self {
            Health::Online => "online",
            Health::Warning => "warning",
            Health::Offline => "offline",
        }
    }
}

/// Classify a SIM port from its config row.
///
/// enabled + seen within 5 min + signal >= 50 → online; seen within 5 min
/// with weak signal → warning; seen within 30 min → warning; otherwise
/// (disabled, never seen, or stale) → offline.
pub fn classify_port(
    enabled: bool,
    last_seen_at: Option<DateTime<Utc>>,
    signal_strength: Option<i64>,
    now: DateTime<Utc>,
) -> Health {
    if !enabled {
        return Health::Offline;
    }
    let Some(last_seen) = last_seen_at else {
        return Health::Offline;
    };
    let age = now - last_seen;
    if age < Duration::minutes(PORT_FRESH_WINDOW_MINS) {
        match signal_strength {
            Some(signal) if signal < PORT_MIN_SIGNAL => Health::Warning,
            _ => Health::Online,
        }
    } else if age < Duration::minutes(PORT_STALE_WINDOW_MINS) {
        Health::Warning
    } else {
        Health::Offline
    }
}

/// Classify the polling agent from its most recent activity-log row.
///
/// The dashboard has no direct channel to the agent; liveness is inferred
/// from how recently an agent-related log entry landed in the datastore.
pub fn classify_agent(last_activity_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Health {
    let Some(last) = last_activity_at else {
        return Health::Offline;
    };
    let age = now - last;
    if age <= Duration::seconds(AGENT_ONLINE_SECS) {
        Health::Online
    } else if age <= Duration::seconds(AGENT_WARNING_SECS) {
        Health::Warning
    } else {
        Health::Offline
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn mins_ago(m: i64) -> Option<DateTime<Utc>> {
        Some(now() - Duration::minutes(m))
    }

    #[test]
    fn fresh_port_with_strong_signal_is_online() {
        assert_eq!(
            classify_port(true, mins_ago(2), Some(75), now()),
            Health::Online
        );
    }

    #[test]
    fn fresh_port_with_weak_signal_is_warning() {
        assert_eq!(
            classify_port(true, mins_ago(2), Some(49), now()),
            Health::Warning
        );
    }

    #[test]
    fn signal_exactly_at_threshold_is_online() {
        assert_eq!(
            classify_port(true, mins_ago(2), Some(50), now()),
            Health::Online
        );
    }

    #[test]
    fn fresh_port_without_signal_reading_is_online() {
        assert_eq!(classify_port(true, mins_ago(2), None, now()), Health::Online);
    }

    #[test]
    fn port_seen_between_five_and_thirty_minutes_is_warning() {
        assert_eq!(
            classify_port(true, mins_ago(10), Some(90), now()),
            Health::Warning
        );
    }

    #[test]
    fn stale_port_is_offline() {
        assert_eq!(
            classify_port(true, mins_ago(31), Some(90), now()),
            Health::Offline
        );
    }

    #[test]
    fn disabled_port_is_offline_regardless_of_recency() {
        assert_eq!(
            classify_port(false, mins_ago(1), Some(90), now()),
            Health::Offline
        );
    }

    #[test]
    fn never_seen_port_is_offline() {
        assert_eq!(classify_port(true, None, Some(90), now()), Health::Offline);
    }

    #[test]
    fn agent_thresholds() {
        let secs = |s: i64| Some(now() - Duration::seconds(s));
        assert_eq!(classify_agent(secs(60), now()), Health::Online);
        assert_eq!(classify_agent(secs(120), now()), Health::Online);
        assert_eq!(classify_agent(secs(121), now()), Health::Warning);
        assert_eq!(classify_agent(secs(300), now()), Health::Warning);
        assert_eq!(classify_agent(secs(301), now()), Health::Offline);
        assert_eq!(classify_agent(None, now()), Health::Offline);
    }
}
