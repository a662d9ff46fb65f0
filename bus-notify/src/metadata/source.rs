//! The fetch seam between proximity search and the upstream service.

use std::future::Future;

use crate::domain::{FeatureId, GeoHash};

use super::client::MetadataClient;
use super::error::MetadataError;
use super::mock::MockMetadataSource;

/// Source of raw upstream responses.
///
/// Implementations only move bytes; decoding happens in the caller so the
/// live client and fixtures share one decoding path.
pub trait MetadataSource: Send + Sync {
    /// Raw tile metadata response for a batch of tiles at `zoom`.
    fn fetch_tiles(
        &self,
        zoom: u8,
        hashes: &[GeoHash],
    ) -> impl Future<Output = Result<String, MetadataError>> + Send;

    /// Raw info window response for a landmark.
    fn fetch_stop_detail(
        &self,
        id: &FeatureId,
    ) -> impl Future<Output = Result<String, MetadataError>> + Send;

    /// HTML place page for a landmark.
    fn fetch_schedule_page(
        &self,
        id: &FeatureId,
    ) -> impl Future<Output = Result<String, MetadataError>> + Send;
}

/// Either the live client or fixtures, chosen at startup.
#[derive(Debug, Clone)]
pub enum AnySource {
    Live(MetadataClient),
    Mock(MockMetadataSource),
}

impl MetadataSource for AnySource {
    async fn fetch_tiles(&self, zoom: u8, hashes: &[GeoHash]) -> Result<String, MetadataError> {
        match self {
            AnySource::Live(client) => client.fetch_tiles(zoom, hashes).await,
            AnySource::Mock(mock) => mock.fetch_tiles(zoom, hashes).await,
        }
    }

    async fn fetch_stop_detail(&self, id: &FeatureId) -> Result<String, MetadataError> {
        match self {
            AnySource::Live(client) => client.fetch_stop_detail(id).await,
            AnySource::Mock(mock) => mock.fetch_stop_detail(id).await,
        }
    }

    async fn fetch_schedule_page(&self, id: &FeatureId) -> Result<String, MetadataError> {
        match self {
            AnySource::Live(client) => client.fetch_schedule_page(id).await,
            AnySource::Mock(mock) => mock.fetch_schedule_page(id).await,
        }
    }
}
