//! Bus lines and their scheduled departures.
//!
//! Schedule pages print departures as 12-hour clock tokens such as
//! `5:45pm` or `11:02 am`. Departures listed after midnight are flagged
//! as next-day so they can be placed on the following calendar date.

use std::fmt;
use std::sync::OnceLock;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;

/// Pattern for a 12-hour clock token.
///
/// Groups: hour, minute, meridiem.
fn clock_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(\d{1,2}):(\d{2})\s*([aApP][mM])").unwrap())
}

/// A scheduled departure time of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Departure {
    pub time: NaiveTime,
    /// Departs after midnight, on the day following the schedule date.
    pub next_day: bool,
}

impl Departure {
    pub fn new(time: NaiveTime, next_day: bool) -> Self {
        Self { time, next_day }
    }

    /// Find the first clock token in `text`.
    ///
    /// Returns `None` when there is no token or the first token is not a
    /// real 12-hour time (e.g. `13:00pm`).
    ///
    /// # Examples
    ///
    /// ```
    /// use bus_notify::domain::Departure;
    ///
    /// let dep = Departure::find_in(" 5:45pm ", false).unwrap();
    /// assert_eq!(dep.to_string(), "05:45 PM");
    /// assert!(Departure::find_in("no service", false).is_none());
    /// ```
    pub fn find_in(text: &str, next_day: bool) -> Option<Self> {
        let caps = clock_pattern().captures(text)?;
        let hour: u32 = caps[1].parse().ok()?;
        let minute: u32 = caps[2].parse().ok()?;
        let pm = caps[3].eq_ignore_ascii_case("pm");

        if !(1..=12).contains(&hour) {
            return None;
        }
        let hour24 = match (hour, pm) {
            (12, false) => 0,
            (12, true) => 12,
            (h, false) => h,
            (h, true) => h + 12,
        };
        let time = NaiveTime::from_hms_opt(hour24, minute, 0)?;
        Some(Self { time, next_day })
    }

    /// The absolute departure instant for a schedule dated `date`.
    pub fn on(&self, date: NaiveDate) -> NaiveDateTime {
        let date = if self.next_day {
            date + Duration::days(1)
        } else {
            date
        };
        date.and_time(self.time)
    }
}

impl fmt::Display for Departure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.time.format("%I:%M %p"))
    }
}

/// One direction of a bus line as listed at a stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusLine {
    /// Short line name (route number)
    pub label: String,
    /// Headsign or direction of travel
    pub direction: Option<String>,
    /// Route color as `#rrggbb`
    pub color: Option<String>,
    /// Departures in page order
    pub departures: Vec<Departure>,
}

impl BusLine {
    /// Label used for listing and notifications: `"<line> - <direction>"`.
    pub fn display_label(&self) -> String {
        match &self.direction {
            Some(direction) => format!("{} - {}", self.label, direction),
            None => self.label.clone(),
        }
    }
}
