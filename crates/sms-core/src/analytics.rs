//! Dashboard analytics aggregation.
//!
//! Simple counting over a fixed lookback window, computed from
//! `(sim_port, received_at)` pairs fetched by the caller. All buckets are
//! zero-filled so charts render a stable axis even on quiet days.

use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use serde::Serialize;

/// Messages counted for one calendar day of the window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyCount {
    /// Day formatted `YYYY-MM-DD` (UTC).
    pub date: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortCount {
    pub port: u16,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HourCount {
    pub hour: u8,
    pub count: u64,
}

/// Aggregated analytics for the dashboard charts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsSummary {
    pub daily: Vec<DailyCount>,
    pub per_port: Vec<PortCount>,
    pub hourly: Vec<HourCount>,
    pub total: u64,
    pub average_per_day: f64,
    pub busiest_port: Option<u16>,
    pub peak_hour: Option<u8>,
}

/// Aggregate message timestamps over the last `days` days (ending at `now`).
///
/// `ports` lists the configured SIM ports so every port appears in the chart
/// even with zero traffic. Messages outside the window or on unknown ports
/// still count toward that port's bucket (ports are extended on demand).
pub fn aggregate(
    messages: &[(u16, DateTime<Utc>)],
    ports: &[u16],
    days: u32,
    now: DateTime<Utc>,
) -> AnalyticsSummary {
    let days = days.max(1);
    let window_start = (now - Duration::days(i64::from(days) - 1))
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .unwrap_or_default()
        .and_utc();

    let mut daily: Vec<DailyCount> = (0..days)
        .map(|i| DailyCount {
            date: (window_start + Duration::days(i64::from(i)))
                .format("%Y-%m-%d")
                .to_string(),
            count: 0,
        })
        .collect();
    let mut per_port: Vec<PortCount> = ports
        .iter()
        .map(|&port| PortCount { port, count: 0 })
        .collect();
    let mut hourly: Vec<HourCount> = (0..24).map(|hour| HourCount { hour, count: 0 }).collect();

    let mut total = 0u64;
    for &(port, received_at) in messages {
        if received_at < window_start || received_at > now {
            continue;
        }
        total += 1;

        let day_index = (received_at - window_start).num_days() as usize;
        if let Some(bucket) = daily.get_mut(day_index) {
            bucket.count += 1;
        }

        match per_port.iter_mut().find(|p| p.port == port) {
            Some(bucket) => bucket.count += 1,
            None => per_port.push(PortCount { port, count: 1 }),
        }

        hourly[received_at.hour() as usize].count += 1;
    }
    per_port.sort_by_key(|p| p.port);

    let busiest_port = per_port
        .iter()
        .filter(|p| p.count > 0)
        .max_by_key(|p| p.count)
        .map(|p| p.port);
    let peak_hour = hourly
        .iter()
        .filter(|h| h.count > 0)
        .max_by_key(|h| h.count)
        .map(|h| h.hour);

    AnalyticsSummary {
        daily,
        per_port,
        hourly,
        total,
        average_per_day: total as f64 / f64::from(days),
        busiest_port,
        peak_hour,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 7, 18, 0, 0).unwrap()
    }

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, hour, 15, 0).unwrap()
    }

    #[test]
    fn empty_input_yields_zeroed_buckets() {
        let summary = aggregate(&[], &[1, 2, 3, 4], 7, now());
        assert_eq!(summary.total, 0);
        assert_eq!(summary.daily.len(), 7);
        assert_eq!(summary.per_port.len(), 4);
        assert_eq!(summary.hourly.len(), 24);
        assert_eq!(summary.busiest_port, None);
        assert_eq!(summary.peak_hour, None);
    }

    #[test]
    fn counts_land_in_the_right_day_bucket() {
        let messages = vec![(1, at(1, 9)), (1, at(1, 10)), (2, at(7, 9))];
        let summary = aggregate(&messages, &[1, 2], 7, now());
        assert_eq!(summary.total, 3);
        assert_eq!(summary.daily[0].date, "2026-03-01");
        assert_eq!(summary.daily[0].count, 2);
        assert_eq!(summary.daily[6].count, 1);
    }

    #[test]
    fn messages_outside_window_are_ignored() {
        let old = Utc.with_ymd_and_hms(2026, 2, 20, 9, 0, 0).unwrap();
        let summary = aggregate(&[(1, old)], &[1], 7, now());
        assert_eq!(summary.total, 0);
    }

    #[test]
    fn busiest_port_and_peak_hour() {
        let messages = vec![(2, at(3, 9)), (2, at(4, 9)), (1, at(5, 14))];
        let summary = aggregate(&messages, &[1, 2], 7, now());
        assert_eq!(summary.busiest_port, Some(2));
        assert_eq!(summary.peak_hour, Some(9));
    }

    #[test]
    fn unknown_port_is_added_on_demand() {
        let summary = aggregate(&[(9, at(6, 9))], &[1, 2], 7, now());
        assert_eq!(
            summary.per_port.iter().find(|p| p.port == 9).unwrap().count,
            1
        );
    }

    #[test]
    fn average_is_total_over_window() {
        let messages = vec![(1, at(6, 9)), (1, at(6, 10)), (1, at(7, 9))];
        let summary = aggregate(&messages, &[1], 7, now());
        assert!((summary.average_per_day - 3.0 / 7.0).abs() < f64::EPSILON);
    }
}
