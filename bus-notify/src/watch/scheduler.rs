//! Background task evaluating the watched line.
//!
//! One task per [`Watcher`]. Selecting a line swaps the shared
//! [`WatchState`] through a `tokio::sync::watch` channel, so the task only
//! ever sees a complete state. Each selection triggers an immediate pass and
//! restarts the tick interval; after that the task evaluates once per tick
//! whether or not anything fired. The task ends when the `Watcher` is
//! dropped.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::config::WatchConfig;

use super::notify::{Notification, NotificationSink};
use super::policy::{DuePolicy, Pass};
use super::state::WatchState;

/// Source of the current local time.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> NaiveDateTime;
}

/// Wall clock in the local timezone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

type Shared = Option<Arc<WatchState>>;

/// Handle to the watch task.
#[derive(Debug)]
pub struct Watcher {
    tx: watch::Sender<Shared>,
}

impl Watcher {
    /// Spawn the watch task on the current runtime, initially idle.
    pub fn spawn<C, N>(config: &WatchConfig, clock: C, sink: N) -> Self
    where
        C: Clock,
        N: NotificationSink + 'static,
    {
        let (tx, rx) = watch::channel(None);
        let policy = DuePolicy::from(config);
        tokio::spawn(run(rx, policy, config.interval, clock, sink));
        Self { tx }
    }

    /// Start watching `state`, replacing any previous line.
    pub fn select(&self, state: WatchState) {
        info!(line = state.label(), stop = state.stop_name(), "watching line");
        self.tx.send_replace(Some(Arc::new(state)));
    }

    /// Stop watching. The task stays alive and idle.
    pub fn clear(&self) {
        if self.tx.send_replace(None).is_some() {
            info!("stopped watching");
        }
    }

    /// The line currently watched.
    pub fn current(&self) -> Option<Arc<WatchState>> {
        self.tx.borrow().clone()
    }
}

async fn run<C: Clock, N: NotificationSink>(
    mut rx: watch::Receiver<Shared>,
    policy: DuePolicy,
    period: Duration,
    clock: C,
    sink: N,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let pass = tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                ticker.reset();
                Pass::Immediate
            }
            _ = ticker.tick() => Pass::Periodic,
        };

        let state = rx.borrow().clone();
        if let Some(state) = state {
            evaluate(&state, clock.now(), pass, &policy, &sink);
        }
    }
    debug!("watch task finished");
}

fn evaluate<N: NotificationSink>(
    state: &WatchState,
    now: NaiveDateTime,
    pass: Pass,
    policy: &DuePolicy,
    sink: &N,
) {
    match policy.select(state.departures(), now, pass) {
        Some(due) => sink.notify(Notification::due(state, &due)),
        None => debug!(line = state.label(), ?pass, "nothing due"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BusLine, Departure};
    use crate::watch::RecentNotifications;
    use chrono::{NaiveDate, NaiveTime};

    /// Fixed start time advanced by tokio's (paused) clock.
    struct TestClock {
        start: NaiveDateTime,
        origin: Instant,
    }

    impl TestClock {
        fn new(start: NaiveDateTime) -> Self {
            Self {
                start,
                origin: Instant::now(),
            }
        }
    }

    impl Clock for TestClock {
        fn now(&self) -> NaiveDateTime {
            let elapsed = Instant::now() - self.origin;
            self.start + chrono::Duration::from_std(elapsed).unwrap()
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    fn state(label: &str, times: &[(u32, u32)]) -> WatchState {
        let line = BusLine {
            label: label.to_string(),
            direction: None,
            color: None,
            departures: times
                .iter()
                .map(|&(h, m)| Departure::new(NaiveTime::from_hms_opt(h, m, 0).unwrap(), false))
                .collect(),
        };
        WatchState::new("Main St", &line, today())
    }

    fn titles(sink: &RecentNotifications) -> Vec<String> {
        let mut titles: Vec<_> = sink.snapshot().into_iter().map(|n| n.title).collect();
        titles.reverse();
        titles
    }

    /// Let the watch task run before the next timer.
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    async fn minutes(n: u64) {
        tokio::time::sleep(Duration::from_secs(n * 60)).await;
    }

    fn watcher(sink: &RecentNotifications) -> Watcher {
        let clock = TestClock::new(today().and_hms_opt(17, 0, 0).unwrap());
        Watcher::spawn(&WatchConfig::default(), clock, sink.clone())
    }

    #[tokio::test(start_paused = true)]
    async fn immediate_then_threshold_passes() {
        let sink = RecentNotifications::new(10);
        let watcher = watcher(&sink);

        watcher.select(state("23", &[(17, 7), (17, 30)]));
        settle().await;
        assert_eq!(titles(&sink), vec!["23 is due in 7 minutes"]);

        // 17:01 nothing, 17:02 is five minutes out
        minutes(2).await;
        assert_eq!(sink.len(), 2);

        // 17:07 due now, 17:10 the next bus is twenty minutes out
        minutes(8).await;
        assert_eq!(
            titles(&sink),
            vec![
                "23 is due in 7 minutes",
                "23 is due in 5 minutes",
                "23 is due in 0 minutes",
                "23 is due in 20 minutes",
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn keeps_ticking_when_nothing_fires() {
        let sink = RecentNotifications::new(10);
        let watcher = watcher(&sink);

        // Far beyond the last threshold: only the immediate pass reports.
        watcher.select(state("5", &[(18, 0)]));
        settle().await;
        minutes(30).await;
        assert_eq!(titles(&sink), vec!["5 is due in 60 minutes"]);

        // 17:40 is twenty minutes out.
        minutes(10).await;
        assert_eq!(sink.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn reselect_replaces_line() {
        let sink = RecentNotifications::new(10);
        let watcher = watcher(&sink);

        watcher.select(state("1", &[(17, 5)]));
        settle().await;
        // One millisecond past 17:00, so 17:30 is 29 whole minutes out.
        watcher.select(state("2", &[(17, 30)]));
        settle().await;

        minutes(5).await;
        assert_eq!(
            titles(&sink),
            vec!["1 is due in 5 minutes", "2 is due in 29 minutes"]
        );
        assert_eq!(watcher.current().unwrap().label(), "2");
    }

    #[tokio::test(start_paused = true)]
    async fn clear_stops_notifications() {
        let sink = RecentNotifications::new(10);
        let watcher = watcher(&sink);

        watcher.select(state("9", &[(17, 10)]));
        settle().await;
        watcher.clear();
        assert!(watcher.current().is_none());

        minutes(15).await;
        assert_eq!(sink.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_until_selected() {
        let sink = RecentNotifications::new(10);
        let watcher = watcher(&sink);

        minutes(5).await;
        assert!(sink.is_empty());
        assert!(watcher.current().is_none());
    }
}
