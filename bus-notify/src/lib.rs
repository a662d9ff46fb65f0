//! Bus stop discovery and departure notifications.
//!
//! Finds bus stops around a point from map tile metadata, scrapes each
//! stop's schedule page for its lines and departures, and notifies as a
//! watched line's next bus approaches.

pub mod cache;
pub mod config;
pub mod domain;
pub mod mercator;
pub mod metadata;
pub mod proximity;
pub mod schedule;
pub mod watch;
pub mod web;
