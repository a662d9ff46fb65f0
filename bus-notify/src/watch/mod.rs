//! Departure watching and notifications.

mod notify;
mod policy;
mod scheduler;
mod state;

pub use notify::{Notification, NotificationSink, RecentNotifications, TracingSink};
pub use policy::{Due, DuePolicy, Pass, minutes_until};
pub use scheduler::{Clock, SystemClock, Watcher};
pub use state::WatchState;
