//! Which departure, if any, is due for a notification.
//!
//! Two kinds of evaluation exist. The immediate pass runs once when a line
//! is selected and reports the soonest upcoming departure so the user sees
//! something right away. Periodic passes only report a departure sitting
//! exactly on a threshold (by default 20, 10, 5 and 0 minutes out), so a
//! departure 7 minutes away is never announced by a periodic pass.
//!
//! At most one departure is reported per pass: the first match in
//! ascending time order.

use chrono::{Duration, NaiveDateTime};

use crate::config::WatchConfig;

/// Kind of evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    /// Runs once at selection time.
    Immediate,
    /// Runs on every scheduler tick.
    Periodic,
}

/// A departure selected for notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Due {
    pub at: NaiveDateTime,
    /// Whole minutes until `at`, rounded down.
    pub minutes: i64,
}

/// Notification thresholds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuePolicy {
    thresholds: Vec<i64>,
    max_lead_mins: i64,
}

impl DuePolicy {
    pub fn new(thresholds: Vec<i64>, max_lead_mins: i64) -> Self {
        Self {
            thresholds,
            max_lead_mins,
        }
    }

    /// First departure in `departures` (ascending) that fires on this pass.
    pub fn select(&self, departures: &[NaiveDateTime], now: NaiveDateTime, pass: Pass) -> Option<Due> {
        departures
            .iter()
            .map(|&at| Due {
                at,
                minutes: minutes_until(at, now),
            })
            .find(|due| self.fires(due.minutes, pass))
    }

    fn fires(&self, minutes: i64, pass: Pass) -> bool {
        let on_threshold = minutes <= self.max_lead_mins && self.thresholds.contains(&minutes);
        match pass {
            Pass::Immediate => minutes > 0 || on_threshold,
            Pass::Periodic => on_threshold,
        }
    }
}

impl Default for DuePolicy {
    fn default() -> Self {
        Self::from(&WatchConfig::default())
    }
}

impl From<&WatchConfig> for DuePolicy {
    fn from(config: &WatchConfig) -> Self {
        Self::new(config.thresholds.clone(), config.max_lead_mins)
    }
}

/// `floor((at - now) / 1 minute)`.
///
/// Departures already past give negative values.
pub fn minutes_until(at: NaiveDateTime, now: NaiveDateTime) -> i64 {
    let delta = at - now;
    let whole = delta.num_seconds();
    // num_seconds truncates toward zero; step down for a negative remainder.
    let secs = if delta < Duration::seconds(whole) {
        whole - 1
    } else {
        whole
    };
    secs.div_euclid(60)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn periodic_minutes_are_thresholds(offsets in proptest::collection::vec(-60i64..120, 0..20)) {
            let now = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap().and_hms_opt(12, 0, 0).unwrap();
            let mut departures: Vec<_> = offsets.iter().map(|&m| now + Duration::minutes(m)).collect();
            departures.sort_unstable();

            if let Some(due) = DuePolicy::default().select(&departures, now, Pass::Periodic) {
                prop_assert!([0, 5, 10, 20].contains(&due.minutes));
            }
        }

        #[test]
        fn immediate_never_reports_past(offsets in proptest::collection::vec(-60i64..120, 0..20)) {
            let now = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap().and_hms_opt(12, 0, 0).unwrap();
            let mut departures: Vec<_> = offsets.iter().map(|&m| now + Duration::minutes(m)).collect();
            departures.sort_unstable();

            let due = DuePolicy::default().select(&departures, now, Pass::Immediate);
            let first_upcoming = departures.iter().copied().find(|&at| at >= now);
            prop_assert_eq!(due.map(|d| d.at), first_upcoming);
        }
    }
}
