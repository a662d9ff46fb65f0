//! Caching layer for upstream lookups.
//!
//! Stop searches are keyed by the tile block they query, so nearby points
//! that land on the same block share an entry. Schedules are keyed by stop
//! id, so selecting another line at the same stop does not refetch the page.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache as MokaCache;

use crate::domain::{BusStops, FeatureId};
use crate::mercator::{CoordinateTransform, GlobalMercator};
use crate::metadata::{MetadataError, MetadataSource};
use crate::proximity::{Proximity, StopSchedule, TileBlock};

/// Configuration for the cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL for cached entries.
    pub ttl: Duration,

    /// Maximum number of cached entries per cache.
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(5 * 60),
            max_capacity: 500,
        }
    }
}

/// Cache for search and schedule results.
pub struct ProximityCache {
    stops: MokaCache<TileBlock, Arc<BusStops>>,
    schedules: MokaCache<FeatureId, Arc<StopSchedule>>,
}

impl ProximityCache {
    /// Create a new cache with the given configuration.
    pub fn new(config: &CacheConfig) -> Self {
        let stops = MokaCache::builder()
            .time_to_live(config.ttl)
            .max_capacity(config.max_capacity)
            .build();
        let schedules = MokaCache::builder()
            .time_to_live(config.ttl)
            .max_capacity(config.max_capacity)
            .build();

        Self { stops, schedules }
    }

    pub async fn get_stops(&self, block: &TileBlock) -> Option<Arc<BusStops>> {
        self.stops.get(block).await
    }

    pub async fn insert_stops(&self, block: TileBlock, stops: Arc<BusStops>) {
        self.stops.insert(block, stops).await;
    }

    pub async fn get_schedule(&self, id: &FeatureId) -> Option<Arc<StopSchedule>> {
        self.schedules.get(id).await
    }

    pub async fn insert_schedule(&self, id: FeatureId, schedule: Arc<StopSchedule>) {
        self.schedules.insert(id, schedule).await;
    }

    /// Invalidate all cached entries.
    pub fn invalidate_all(&self) {
        self.stops.invalidate_all();
        self.schedules.invalidate_all();
    }
}

/// Proximity search with caching.
///
/// Failures are never cached.
pub struct CachedProximity<S, T = GlobalMercator> {
    inner: Proximity<S, T>,
    cache: ProximityCache,
}

impl<S: MetadataSource, T: CoordinateTransform> CachedProximity<S, T> {
    pub fn new(inner: Proximity<S, T>, cache_config: &CacheConfig) -> Self {
        Self {
            inner,
            cache: ProximityCache::new(cache_config),
        }
    }

    /// Nearby stops, using the cache if the tile block was seen recently.
    pub async fn find_nearby_stops(
        &self,
        lat: f64,
        lng: f64,
        radius_m: f64,
        zoom: u8,
    ) -> Result<Arc<BusStops>, MetadataError> {
        let block = self.inner.tile_block(lat, lng, radius_m, zoom);

        if let Some(cached) = self.cache.get_stops(&block).await {
            return Ok(cached);
        }

        let stops = Arc::new(self.inner.stops_in_block(&block).await?);
        self.cache.insert_stops(block, stops.clone()).await;

        Ok(stops)
    }

    /// Schedule of a stop, using the cache if available.
    pub async fn stop_schedule(&self, id: &FeatureId) -> Result<Arc<StopSchedule>, MetadataError> {
        if let Some(cached) = self.cache.get_schedule(id).await {
            return Ok(cached);
        }

        let schedule = Arc::new(self.inner.stop_schedule(id).await?);
        self.cache.insert_schedule(id.clone(), schedule.clone()).await;

        Ok(schedule)
    }

    /// Access the uncached orchestrator.
    pub fn inner(&self) -> &Proximity<S, T> {
        &self.inner
    }

    /// Invalidate all cached entries.
    pub fn invalidate_cache(&self) {
        self.cache.invalidate_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProximityConfig;
    use crate::metadata::MockMetadataSource;

    const TILES: &str = r#"cb([{features:[{id:"0x1",bb:[-7,-7,6,6],c:"{1:{\"title\":\"Main St\"}}"}]}])"#;

    fn cached(mock: &MockMetadataSource) -> CachedProximity<MockMetadataSource> {
        let proximity = Proximity::mercator(mock.clone(), ProximityConfig::default());
        CachedProximity::new(proximity, &CacheConfig::default())
    }

    #[test]
    fn default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.ttl, Duration::from_secs(300));
        assert_eq!(config.max_capacity, 500);
    }

    #[tokio::test]
    async fn same_block_is_fetched_once() {
        let mock = MockMetadataSource::new().with_tiles(TILES);
        let cached = cached(&mock);

        let first = cached
            .find_nearby_stops(42.02891, -93.647096, 500.0, 17)
            .await
            .unwrap();
        // A few meters away: same tiles.
        let second = cached
            .find_nearby_stops(42.02892, -93.647095, 500.0, 17)
            .await
            .unwrap();

        assert_eq!(first.len(), 1);
        assert_eq!(first, second);
        assert_eq!(mock.requested_tiles().len(), 1);

        cached.invalidate_cache();
        cached
            .find_nearby_stops(42.02891, -93.647096, 500.0, 17)
            .await
            .unwrap();
        assert_eq!(mock.requested_tiles().len(), 2);
    }

    #[tokio::test]
    async fn different_radius_is_a_different_block() {
        let mock = MockMetadataSource::new().with_tiles(TILES);
        let cached = cached(&mock);

        for radius in [500.0, 1000.0] {
            cached
                .find_nearby_stops(42.02891, -93.647096, radius, 17)
                .await
                .unwrap();
        }
        assert_eq!(mock.requested_tiles().len(), 2);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let mock = MockMetadataSource::new();
        let cached = cached(&mock);

        for _ in 0..2 {
            assert!(
                cached
                    .find_nearby_stops(42.02891, -93.647096, 500.0, 17)
                    .await
                    .is_err()
            );
        }
        assert_eq!(mock.requested_tiles().len(), 2);
    }

    #[tokio::test]
    async fn schedule_is_cached_by_stop() {
        let id = FeatureId::new("0x1");
        let mock = MockMetadataSource::new().with_stop(
            id.clone(),
            r#"{"latlng":{"lat":1.0,"lng":2.0}}"#,
            "<p>no table</p>",
        );
        let cached = cached(&mock);

        let first = cached.stop_schedule(&id).await.unwrap();
        let second = cached.stop_schedule(&id).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(first.lines.is_empty());
        assert_eq!(first.agency, None);
    }
}
