//! The line currently being watched.

use chrono::{NaiveDate, NaiveDateTime};

use crate::domain::BusLine;

/// A watched line at one stop, with departures placed on the calendar.
///
/// Built once per selection and never mutated; selecting another line
/// builds a new one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchState {
    stop_name: String,
    label: String,
    departures: Vec<NaiveDateTime>,
}

impl WatchState {
    /// Materialize `line` against the schedule date `today`.
    ///
    /// Next-day departures land on the following date. The result is
    /// sorted ascending regardless of page order.
    pub fn new(stop_name: impl Into<String>, line: &BusLine, today: NaiveDate) -> Self {
        let mut departures: Vec<_> = line.departures.iter().map(|d| d.on(today)).collect();
        departures.sort_unstable();

        Self {
            stop_name: stop_name.into(),
            label: line.display_label(),
            departures,
        }
    }

    pub fn stop_name(&self) -> &str {
        &self.stop_name
    }

    /// Display label of the watched line.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Departure instants, ascending.
    pub fn departures(&self) -> &[NaiveDateTime] {
        &self.departures
    }
}
