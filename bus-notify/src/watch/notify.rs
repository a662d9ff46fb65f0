//! Notification delivery.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tracing::info;

use super::policy::Due;
use super::state::WatchState;

/// A notification as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

impl Notification {
    /// Announce `due` for the watched line.
    ///
    /// ```text
    /// 23 - Downtown is due in 5 minutes
    /// @ Main St on 05:45 PM
    /// ```
    pub fn due(state: &WatchState, due: &Due) -> Self {
        Self {
            title: format!("{} is due in {} minutes", state.label(), due.minutes),
            body: format!("@ {} on {}", state.stop_name(), due.at.format("%I:%M %p")),
        }
    }
}

/// Receiver of notifications.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Writes notifications to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&self, notification: Notification) {
        info!(title = %notification.title, body = %notification.body, "notification");
    }
}

/// Keeps the most recent notifications in memory.
#[derive(Debug, Clone)]
pub struct RecentNotifications {
    inner: Arc<Mutex<VecDeque<Notification>>>,
    capacity: usize,
}

impl RecentNotifications {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    /// Stored notifications, newest first.
    pub fn snapshot(&self) -> Vec<Notification> {
        self.inner
            .lock()
            .map(|q| q.iter().rev().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|q| q.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl NotificationSink for RecentNotifications {
    fn notify(&self, notification: Notification) {
        if self.capacity == 0 {
            return;
        }
        if let Ok(mut queue) = self.inner.lock() {
            if queue.len() == self.capacity {
                queue.pop_front();
            }
            queue.push_back(notification);
        }
    }
}

/// Deliver to both sinks.
impl<A: NotificationSink, B: NotificationSink> NotificationSink for (A, B) {
    fn notify(&self, notification: Notification) {
        self.0.notify(notification.clone());
        self.1.notify(notification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BusLine, Departure};
    use chrono::{NaiveDate, NaiveTime};

    fn note(n: usize) -> Notification {
        Notification {
            title: format!("t{n}"),
            body: String::new(),
        }
    }

    #[test]
    fn notification_text() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let line = BusLine {
            label: "23".to_string(),
            direction: Some("Downtown".to_string()),
            color: None,
            departures: vec![Departure::new(
                NaiveTime::from_hms_opt(17, 45, 0).unwrap(),
                false,
            )],
        };
        let state = WatchState::new("Main St", &line, today);
        let due = Due {
            at: state.departures()[0],
            minutes: 5,
        };

        let n = Notification::due(&state, &due);
        assert_eq!(n.title, "23 - Downtown is due in 5 minutes");
        assert_eq!(n.body, "@ Main St on 05:45 PM");
    }

    #[test]
    fn recent_keeps_newest() {
        let recent = RecentNotifications::new(2);
        for n in 0..3 {
            recent.notify(note(n));
        }
        assert_eq!(recent.len(), 2);
        assert_eq!(recent.snapshot(), vec![note(2), note(1)]);
    }

    #[test]
    fn zero_capacity_stores_nothing() {
        let recent = RecentNotifications::new(0);
        recent.notify(note(0));
        assert!(recent.is_empty());
    }

    #[test]
    fn pair_delivers_to_both() {
        let a = RecentNotifications::new(5);
        let b = RecentNotifications::new(5);
        (a.clone(), b.clone()).notify(note(1));
        assert_eq!(a.snapshot(), vec![note(1)]);
        assert_eq!(b.snapshot(), vec![note(1)]);
    }

    #[test]
    fn clones_share_storage() {
        let recent = RecentNotifications::new(5);
        let handle = recent.clone();
        handle.notify(note(1));
        assert_eq!(recent.len(), 1);
    }
}
