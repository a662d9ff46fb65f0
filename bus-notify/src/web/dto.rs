//! Data transfer objects for web requests and responses.

use serde::{Deserialize, Serialize};

use crate::domain::{BusLine, BusStop, Departure, FeatureId, LatLng};
use crate::proximity::StopSchedule;
use crate::watch::{Notification, WatchState};

/// Query for nearby stops.
#[derive(Debug, Deserialize)]
pub struct StopSearchRequest {
    pub lat: f64,
    pub lng: f64,

    /// Search radius in meters (defaults to the configured radius)
    pub radius: Option<f64>,
}

/// A stop in search results.
#[derive(Debug, Serialize)]
pub struct StopResult {
    pub id: FeatureId,
    pub caption: String,
}

impl From<&BusStop> for StopResult {
    fn from(stop: &BusStop) -> Self {
        Self {
            id: stop.id.clone(),
            caption: stop.caption.clone(),
        }
    }
}

/// Response for a stop search.
#[derive(Debug, Serialize)]
pub struct StopSearchResponse {
    pub stops: Vec<StopResult>,
}

/// A departure as displayed.
#[derive(Debug, Serialize)]
pub struct DepartureResult {
    /// Clock time, e.g. "05:45 PM"
    pub time: String,

    /// Departs after midnight
    pub next_day: bool,
}

impl From<&Departure> for DepartureResult {
    fn from(dep: &Departure) -> Self {
        Self {
            time: dep.to_string(),
            next_day: dep.next_day,
        }
    }
}

/// One line at a stop.
#[derive(Debug, Serialize)]
pub struct LineResult {
    /// Position in the stop's line list, used to select the line
    pub index: usize,

    pub line: String,
    pub direction: Option<String>,
    pub color: Option<String>,

    /// "<line> - <direction>"
    pub label: String,

    pub departures: Vec<DepartureResult>,
}

impl LineResult {
    pub fn from_line(index: usize, line: &BusLine) -> Self {
        Self {
            index,
            line: line.label.clone(),
            direction: line.direction.clone(),
            color: line.color.clone(),
            label: line.display_label(),
            departures: line.departures.iter().map(DepartureResult::from).collect(),
        }
    }
}

/// Response for a stop schedule.
#[derive(Debug, Serialize)]
pub struct ScheduleResponse {
    pub stop_id: FeatureId,
    pub location: LatLng,
    pub agency: Option<String>,
    pub lines: Vec<LineResult>,
}

impl From<&StopSchedule> for ScheduleResponse {
    fn from(schedule: &StopSchedule) -> Self {
        Self {
            stop_id: schedule.stop_id.clone(),
            location: schedule.location,
            agency: schedule.agency.clone(),
            lines: schedule
                .lines
                .iter()
                .enumerate()
                .map(|(i, line)| LineResult::from_line(i, line))
                .collect(),
        }
    }
}

/// Request to start watching a line.
#[derive(Debug, Deserialize)]
pub struct WatchRequest {
    pub stop_id: String,
    pub stop_name: String,

    /// Index into the stop's line list
    pub line: usize,
}

/// The line being watched.
#[derive(Debug, Serialize)]
pub struct WatchResponse {
    pub label: String,
    pub stop_name: String,

    /// Departure instants, formatted "YYYY-MM-DD HH:MM"
    pub departures: Vec<String>,
}

impl From<&WatchState> for WatchResponse {
    fn from(state: &WatchState) -> Self {
        Self {
            label: state.label().to_string(),
            stop_name: state.stop_name().to_string(),
            departures: state
                .departures()
                .iter()
                .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
                .collect(),
        }
    }
}

/// Recent notifications, newest first.
#[derive(Debug, Serialize)]
pub struct NotificationsResponse {
    pub notifications: Vec<Notification>,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
