//! HTTP client for the map metadata endpoints.
//!
//! Three endpoints are used:
//! - tile metadata (`/vt/ft`): landmarks on a batch of tiles, addressed by geohash
//! - info window (`/maps/iw`): coordinates and agency of one landmark
//! - place page (`/maps/place`): HTML page with the stop's schedule table
//!
//! Every request carries a random JSONP callback name. The service ignores
//! its value but caches less aggressively when it changes.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::Semaphore;
use tracing::debug;

use crate::domain::{FeatureId, GeoHash};

use super::error::MetadataError;
use super::source::MetadataSource;

/// Default tile metadata mirrors; one is picked per request.
const DEFAULT_TILE_SERVERS: [&str; 2] = ["http://mt0.google.com", "http://mt1.google.com"];

/// Default info window endpoint.
const DEFAULT_DETAIL_URL: &str = "http://maps.google.com/maps/iw";

/// Default place page endpoint.
const DEFAULT_PLACE_URL: &str = "http://maps.google.com/maps/place";

/// Default maximum concurrent requests.
const DEFAULT_MAX_CONCURRENT: usize = 5;

/// Length of the random callback suffix.
const NONCE_LEN: usize = 9;

/// Configuration for the metadata client.
#[derive(Debug, Clone)]
pub struct MetadataConfig {
    /// Base URLs of the tile metadata mirrors
    pub tile_servers: Vec<String>,
    /// Info window endpoint
    pub detail_url: String,
    /// Place page endpoint
    pub place_url: String,
    /// Map layer for tile metadata requests
    pub tile_layer: String,
    /// Map layer for info window requests
    pub detail_layer: String,
    /// Region code (`gl`)
    pub region: String,
    /// Interface language (`hl`)
    pub language: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Maximum concurrent requests
    pub max_concurrent: usize,
}

impl MetadataConfig {
    /// Point every endpoint at a single base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.detail_url = format!("{url}/maps/iw");
        self.place_url = format!("{url}/maps/place");
        self.tile_servers = vec![url];
        self
    }

    /// Set region and language.
    pub fn with_locale(mut self, region: impl Into<String>, language: impl Into<String>) -> Self {
        self.region = region.into();
        self.language = language.into();
        self
    }

    /// Set maximum concurrent requests.
    pub fn with_max_concurrent(mut self, n: usize) -> Self {
        self.max_concurrent = n;
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            tile_servers: DEFAULT_TILE_SERVERS.iter().map(|s| s.to_string()).collect(),
            detail_url: DEFAULT_DETAIL_URL.to_string(),
            place_url: DEFAULT_PLACE_URL.to_string(),
            tile_layer: "m@145".to_string(),
            detail_layer: "m@140".to_string(),
            region: "us".to_string(),
            language: "en".to_string(),
            timeout_secs: 30,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
        }
    }
}

/// Client for the live metadata service.
#[derive(Debug, Clone)]
pub struct MetadataClient {
    http: reqwest::Client,
    config: Arc<MetadataConfig>,
    semaphore: Arc<Semaphore>,
}

impl MetadataClient {
    /// Create a new client with the given configuration.
    pub fn new(config: MetadataConfig) -> Result<Self, MetadataError> {
        if config.tile_servers.is_empty() {
            return Err(MetadataError::Config(
                "no tile servers configured".to_string(),
            ));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent)),
            config: Arc::new(config),
        })
    }

    /// Query parameters for a tile metadata request.
    fn tile_query(&self, zoom: u8, hashes: &[GeoHash]) -> Vec<(&'static str, String)> {
        let las = hashes
            .iter()
            .map(GeoHash::as_str)
            .collect::<Vec<_>>()
            .join(",");

        vec![
            ("lyrs", self.config.tile_layer.clone()),
            ("las", las),
            ("gl", self.config.region.clone()),
            ("hl", self.config.language.clone()),
            ("xc", "1".to_string()),
            ("z", zoom.to_string()),
            ("opts", "z".to_string()),
            ("callback", callback_name()),
        ]
    }

    /// GET `url` and return the body of a successful response.
    async fn get_text(
        &self,
        url: &str,
        query: &[(&'static str, String)],
    ) -> Result<String, MetadataError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| MetadataError::Shutdown)?;

        let response = self.http.get(url).query(query).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MetadataError::Api {
                status: status.as_u16(),
                message: body.chars().take(500).collect(),
            });
        }

        Ok(response.text().await?)
    }
}

impl MetadataSource for MetadataClient {
    async fn fetch_tiles(&self, zoom: u8, hashes: &[GeoHash]) -> Result<String, MetadataError> {
        let url = format!("{}/vt/ft", pick_server(&self.config.tile_servers));
        let query = self.tile_query(zoom, hashes);
        debug!(tiles = hashes.len(), zoom, "fetching tile metadata");
        self.get_text(&url, &query).await
    }

    async fn fetch_stop_detail(&self, id: &FeatureId) -> Result<String, MetadataError> {
        let query = [
            ("ftid", id.as_str().to_string()),
            ("lyr", self.config.detail_layer.clone()),
            ("iwp", "maps_app".to_string()),
            ("callback", callback_name()),
        ];
        self.get_text(&self.config.detail_url, &query).await
    }

    async fn fetch_schedule_page(&self, id: &FeatureId) -> Result<String, MetadataError> {
        let query = [("ftid", id.as_str().to_string())];
        self.get_text(&self.config.place_url, &query).await
    }
}

/// A JSONP callback name such as `_xdc_._k3j2h1g0f`.
fn callback_name() -> String {
    format!("_xdc_._{}", nonce())
}

/// Random `[a-z0-9]` token of [`NONCE_LEN`] characters.
fn nonce() -> String {
    let mut rng = rand::rng();
    (0..NONCE_LEN)
        .map(|_| {
            let n: u8 = rng.random_range(0..36);
            if n < 26 {
                char::from(b'a' + n)
            } else {
                char::from(b'0' + n - 26)
            }
        })
        .collect()
}

fn pick_server(servers: &[String]) -> &str {
    let index = rand::rng().random_range(0..servers.len());
    &servers[index]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::encode_tile;

    #[test]
    fn config_defaults() {
        let config = MetadataConfig::default();
        assert_eq!(config.tile_servers.len(), 2);
        assert_eq!(config.detail_url, DEFAULT_DETAIL_URL);
        assert_eq!(config.tile_layer, "m@145");
        assert_eq!(config.detail_layer, "m@140");
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.max_concurrent, DEFAULT_MAX_CONCURRENT);
    }

    #[test]
    fn config_builder() {
        let config = MetadataConfig::default()
            .with_base_url("http://localhost:8080")
            .with_locale("gb", "en-GB")
            .with_max_concurrent(2)
            .with_timeout(5);

        assert_eq!(config.tile_servers, vec!["http://localhost:8080".to_string()]);
        assert_eq!(config.detail_url, "http://localhost:8080/maps/iw");
        assert_eq!(config.place_url, "http://localhost:8080/maps/place");
        assert_eq!(config.region, "gb");
        assert_eq!(config.language, "en-GB");
        assert_eq!(config.max_concurrent, 2);
        assert_eq!(config.timeout_secs, 5);
    }

    #[test]
    fn client_requires_tile_server() {
        let config = MetadataConfig {
            tile_servers: vec![],
            ..MetadataConfig::default()
        };
        assert!(matches!(
            MetadataClient::new(config),
            Err(MetadataError::Config(_))
        ));
        assert!(MetadataClient::new(MetadataConfig::default()).is_ok());
    }

    #[test]
    fn tile_query_parameters() {
        let client = MetadataClient::new(MetadataConfig::default()).unwrap();
        let hashes = vec![encode_tile(3, 5, 4), encode_tile(4, 5, 4)];
        let query = client.tile_query(4, &hashes);

        let get = |key: &str| {
            query
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.clone())
                .unwrap()
        };
        assert_eq!(get("las"), "tuvw,twtu");
        assert_eq!(get("z"), "4");
        assert_eq!(get("lyrs"), "m@145");
        assert_eq!(get("gl"), "us");
        assert_eq!(get("hl"), "en");
        assert!(get("callback").starts_with("_xdc_._"));
    }

    #[test]
    fn nonce_shape() {
        let token = nonce();
        assert_eq!(token.len(), NONCE_LEN);
        assert!(
            token
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        );
    }

    #[test]
    fn picks_configured_server() {
        let servers = vec!["http://a".to_string(), "http://b".to_string()];
        for _ in 0..20 {
            let picked = pick_server(&servers);
            assert!(servers.iter().any(|s| s == picked), "{picked}");
        }
    }
}
