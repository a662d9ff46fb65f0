//! Application state for the web layer.

use std::sync::Arc;

use crate::cache::CachedProximity;
use crate::config::ProximityConfig;
use crate::metadata::AnySource;
use crate::watch::{RecentNotifications, Watcher};

/// Shared application state.
///
/// Contains all the services needed to handle requests.
#[derive(Clone)]
pub struct AppState {
    /// Cached stop search and schedules
    pub proximity: Arc<CachedProximity<AnySource>>,

    /// The single watch task
    pub watcher: Arc<Watcher>,

    /// Notifications delivered by the watcher
    pub notifications: RecentNotifications,
}

impl AppState {
    /// Create a new app state.
    pub fn new(
        proximity: CachedProximity<AnySource>,
        watcher: Watcher,
        notifications: RecentNotifications,
    ) -> Self {
        Self {
            proximity: Arc::new(proximity),
            watcher: Arc::new(watcher),
            notifications,
        }
    }

    /// Search defaults.
    pub fn config(&self) -> &ProximityConfig {
        self.proximity.inner().config()
    }
}
