//! Fixture-backed metadata source for development and tests.
//!
//! Serves canned responses instead of contacting the live service. A
//! fixture directory looks like:
//!
//! ```text
//! tiles.txt            raw tile metadata response (any tiles)
//! stops/<ftid>.json    raw info window response for a landmark
//! stops/<ftid>.html    place page for a landmark
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::domain::{FeatureId, GeoHash};

use super::error::MetadataError;
use super::source::MetadataSource;

/// Metadata source that answers from memory.
#[derive(Debug, Clone, Default)]
pub struct MockMetadataSource {
    tiles: Option<String>,
    details: HashMap<FeatureId, String>,
    pages: HashMap<FeatureId, String>,
    /// Hash batches requested so far
    requests: Arc<Mutex<Vec<Vec<GeoHash>>>>,
}

impl MockMetadataSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Respond to every tile request with `body`.
    pub fn with_tiles(mut self, body: impl Into<String>) -> Self {
        self.tiles = Some(body.into());
        self
    }

    /// Register the info window and place page for a landmark.
    pub fn with_stop(
        mut self,
        id: FeatureId,
        detail: impl Into<String>,
        page: impl Into<String>,
    ) -> Self {
        self.details.insert(id.clone(), detail.into());
        self.pages.insert(id, page.into());
        self
    }

    /// Load fixtures from a directory.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, MetadataError> {
        let dir = dir.as_ref();
        let mut mock = Self::new();

        let tiles_path = dir.join("tiles.txt");
        if tiles_path.is_file() {
            mock.tiles = Some(read(&tiles_path)?);
        }

        let stops_dir = dir.join("stops");
        let entries = std::fs::read_dir(&stops_dir).map_err(|e| {
            MetadataError::Config(format!(
                "Failed to read mock stops directory {:?}: {}",
                stops_dir, e
            ))
        })?;

        for entry in entries {
            let entry = entry.map_err(|e| {
                MetadataError::Config(format!("Failed to read directory entry: {}", e))
            })?;
            let path = entry.path();
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let id = FeatureId::new(stem);

            match path.extension().and_then(|s| s.to_str()) {
                Some("json") => {
                    mock.details.insert(id, read(&path)?);
                }
                Some("html") => {
                    mock.pages.insert(id, read(&path)?);
                }
                _ => {}
            }
        }

        if mock.tiles.is_none() && mock.details.is_empty() {
            return Err(MetadataError::Config(format!(
                "No mock fixtures found in {:?}",
                dir
            )));
        }

        Ok(mock)
    }

    /// Landmarks with a registered info window.
    pub fn stop_ids(&self) -> Vec<FeatureId> {
        let mut ids: Vec<_> = self.details.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Hash batches passed to `fetch_tiles`, in call order.
    pub fn requested_tiles(&self) -> Vec<Vec<GeoHash>> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

fn read(path: &Path) -> Result<String, MetadataError> {
    std::fs::read_to_string(path)
        .map_err(|e| MetadataError::Config(format!("Failed to read {:?}: {}", path, e)))
}

impl MetadataSource for MockMetadataSource {
    async fn fetch_tiles(&self, _zoom: u8, hashes: &[GeoHash]) -> Result<String, MetadataError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(hashes.to_vec());
        }
        self.tiles.clone().ok_or_else(|| MetadataError::Api {
            status: 404,
            message: "No mock tile data".to_string(),
        })
    }

    async fn fetch_stop_detail(&self, id: &FeatureId) -> Result<String, MetadataError> {
        self.details
            .get(id)
            .cloned()
            .ok_or_else(|| MetadataError::NotFound(id.to_string()))
    }

    async fn fetch_schedule_page(&self, id: &FeatureId) -> Result<String, MetadataError> {
        self.pages
            .get(id)
            .cloned()
            .ok_or_else(|| MetadataError::NotFound(id.to_string()))
    }
}
