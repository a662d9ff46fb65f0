//! Configuration for proximity search, watching and the server binary.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::domain::MAX_ZOOM;
use crate::metadata::{BUS_STOP_BOUNDING_BOX, BoundingBox};

/// Largest search radius accepted, in meters.
pub const DEFAULT_MAX_RADIUS_M: f64 = 2000.0;

/// Most tiles one search may request.
pub const DEFAULT_MAX_TILES: u64 = 1024;

/// Parameters of a nearby-stop search.
#[derive(Debug, Clone, PartialEq)]
pub struct ProximityConfig {
    /// Zoom level of the tiles queried.
    pub zoom: u8,

    /// Default search radius in meters.
    pub radius_m: f64,

    /// Searches with a larger radius are rejected.
    pub max_radius_m: f64,

    /// Tile blocks with more tiles than this are never fetched.
    pub max_tiles: u64,

    /// Bounding box that marks a landmark as a bus stop.
    pub stop_sentinel: BoundingBox,
}

impl ProximityConfig {
    pub fn new(zoom: u8, radius_m: f64) -> Self {
        Self {
            zoom,
            radius_m,
            max_radius_m: DEFAULT_MAX_RADIUS_M,
            max_tiles: DEFAULT_MAX_TILES,
            stop_sentinel: BUS_STOP_BOUNDING_BOX,
        }
    }

    /// Override the bus stop bounding box.
    pub fn with_sentinel(mut self, sentinel: BoundingBox) -> Self {
        self.stop_sentinel = sentinel;
        self
    }
}

impl Default for ProximityConfig {
    fn default() -> Self {
        Self::new(17, 500.0)
    }
}

/// Parameters of the departure watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchConfig {
    /// Time between periodic evaluations.
    pub interval: Duration,

    /// Minutes-to-due values announced by periodic evaluations.
    pub thresholds: Vec<i64>,

    /// Departures further out than this (minutes) are never announced
    /// by periodic evaluations.
    pub max_lead_mins: i64,

    /// Notifications kept for the API.
    pub history: usize,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            thresholds: vec![0, 5, 10, 20],
            max_lead_mins: 20,
            history: 50,
        }
    }
}

/// Invalid configuration value.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Settings of the server binary, read from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// `BUS_NOTIFY_ADDR`
    pub addr: SocketAddr,

    /// `BUS_NOTIFY_MOCK_DIR`: serve fixtures instead of the live service.
    pub mock_dir: Option<PathBuf>,

    /// `BUS_NOTIFY_ZOOM`, `BUS_NOTIFY_RADIUS` and `BUS_NOTIFY_MAX_RADIUS`
    pub proximity: ProximityConfig,
}

impl ServerConfig {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`, falling back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(addr) = lookup("BUS_NOTIFY_ADDR") {
            config.addr = parse("BUS_NOTIFY_ADDR", addr)?;
        }
        config.mock_dir = lookup("BUS_NOTIFY_MOCK_DIR")
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from);
        if let Some(zoom) = lookup("BUS_NOTIFY_ZOOM") {
            let zoom: u8 = parse("BUS_NOTIFY_ZOOM", zoom)?;
            if zoom == 0 || zoom > MAX_ZOOM {
                return Err(ConfigError::Invalid {
                    name: "BUS_NOTIFY_ZOOM",
                    value: zoom.to_string(),
                });
            }
            config.proximity.zoom = zoom;
        }
        if let Some(radius) = lookup("BUS_NOTIFY_RADIUS") {
            let radius: f64 = parse("BUS_NOTIFY_RADIUS", radius)?;
            if !(radius.is_finite() && radius > 0.0) {
                return Err(ConfigError::Invalid {
                    name: "BUS_NOTIFY_RADIUS",
                    value: radius.to_string(),
                });
            }
            config.proximity.radius_m = radius;
        }
        if let Some(max) = lookup("BUS_NOTIFY_MAX_RADIUS") {
            let max: f64 = parse("BUS_NOTIFY_MAX_RADIUS", max)?;
            if !(max.is_finite() && max > 0.0) {
                return Err(ConfigError::Invalid {
                    name: "BUS_NOTIFY_MAX_RADIUS",
                    value: max.to_string(),
                });
            }
            config.proximity.max_radius_m = max;
        }
        if config.proximity.radius_m > config.proximity.max_radius_m {
            return Err(ConfigError::Invalid {
                name: "BUS_NOTIFY_RADIUS",
                value: format!(
                    "{} exceeds maximum {}",
                    config.proximity.radius_m, config.proximity.max_radius_m
                ),
            });
        }

        Ok(config)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            mock_dir: None,
            proximity: ProximityConfig::default(),
        }
    }
}

fn parse<T: std::str::FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { name, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_config() {
        let proximity = ProximityConfig::default();
        assert_eq!(proximity.zoom, 17);
        assert_eq!(proximity.radius_m, 500.0);
        assert_eq!(proximity.max_radius_m, 2000.0);
        assert_eq!(proximity.max_tiles, 1024);
        assert_eq!(proximity.stop_sentinel, [-7, -7, 6, 6]);

        let watch = WatchConfig::default();
        assert_eq!(watch.interval, Duration::from_secs(60));
        assert_eq!(watch.thresholds, vec![0, 5, 10, 20]);
        assert_eq!(watch.max_lead_mins, 20);
        assert_eq!(watch.history, 50);
    }

    #[test]
    fn custom_sentinel() {
        let config = ProximityConfig::new(16, 250.0).with_sentinel([-8, -8, 7, 7]);
        assert_eq!(config.zoom, 16);
        assert_eq!(config.stop_sentinel, [-8, -8, 7, 7]);
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.addr.to_string(), "127.0.0.1:3000");
    }

    #[test]
    fn reads_environment() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("BUS_NOTIFY_ADDR", "0.0.0.0:8080"),
            ("BUS_NOTIFY_MOCK_DIR", "data/mock"),
            ("BUS_NOTIFY_ZOOM", "16"),
            ("BUS_NOTIFY_RADIUS", " 750 "),
            ("BUS_NOTIFY_MAX_RADIUS", "1500"),
        ]))
        .unwrap();

        assert_eq!(config.addr.port(), 8080);
        assert_eq!(config.mock_dir, Some(PathBuf::from("data/mock")));
        assert_eq!(config.proximity.zoom, 16);
        assert_eq!(config.proximity.radius_m, 750.0);
        assert_eq!(config.proximity.max_radius_m, 1500.0);
    }

    #[test]
    fn empty_mock_dir_is_unset() {
        let config = ServerConfig::from_lookup(lookup(&[("BUS_NOTIFY_MOCK_DIR", "")])).unwrap();
        assert_eq!(config.mock_dir, None);
    }

    #[test]
    fn rejects_bad_values() {
        for (key, value) in [
            ("BUS_NOTIFY_ADDR", "localhost"),
            ("BUS_NOTIFY_ZOOM", "0"),
            ("BUS_NOTIFY_ZOOM", "40"),
            ("BUS_NOTIFY_ZOOM", "x"),
            ("BUS_NOTIFY_RADIUS", "-5"),
            ("BUS_NOTIFY_RADIUS", "NaN"),
            ("BUS_NOTIFY_RADIUS", "5000"),
            ("BUS_NOTIFY_MAX_RADIUS", "0"),
        ] {
            let err = ServerConfig::from_lookup(lookup(&[(key, value)])).unwrap_err();
            assert!(err.to_string().contains(key), "{key}={value}: {err}");
        }
    }

    #[test]
    fn default_radius_must_fit_maximum() {
        let err = ServerConfig::from_lookup(lookup(&[("BUS_NOTIFY_MAX_RADIUS", "100")]))
            .unwrap_err();
        assert!(err.to_string().contains("exceeds maximum 100"), "{err}");

        let config = ServerConfig::from_lookup(lookup(&[
            ("BUS_NOTIFY_RADIUS", "100"),
            ("BUS_NOTIFY_MAX_RADIUS", "100"),
        ]))
        .unwrap();
        assert_eq!(config.proximity.max_radius_m, 100.0);
    }
}
