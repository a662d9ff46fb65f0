//! Nearby stop search and per-stop schedules.
//!
//! A search projects the query point and the corner `radius` meters up and
//! to the left onto tiles, then asks for every tile in the square block
//! starting at that corner in a single batched request.

use tracing::{debug, info};

use crate::config::ProximityConfig;
use crate::domain::{BusLine, BusStops, FeatureId, GeoHash, LatLng, TileCoord, grid_size};
use crate::mercator::{CoordinateTransform, GlobalMercator};
use crate::metadata::{
    MetadataError, MetadataSource, TileMetadata, decode_stop_detail, decode_tile_metadata,
    extract_bus_stops,
};
use crate::schedule::extract_schedule;

/// Square block of tiles, addressed in the XYZ convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileBlock {
    /// Top-left tile column
    pub x: i64,
    /// Top-left tile row
    pub y: i64,
    /// Tiles per side
    pub width: u32,
    pub zoom: u8,
}

impl TileBlock {
    /// Block covering `radius_m` around a point.
    ///
    /// The side is twice the larger axis offset between the point's tile and
    /// the corner tile, and at least one tile.
    pub fn around<T: CoordinateTransform + ?Sized>(
        transform: &T,
        lat: f64,
        lng: f64,
        radius_m: f64,
        zoom: u8,
    ) -> Self {
        let (mx, my) = transform.lat_lon_to_meters(lat, lng);

        let (cx, cy) = transform.meters_to_tile(mx, my, zoom);
        let (cx, cy) = transform.flip_y(cx, cy, zoom);

        let (x, y) = transform.meters_to_tile(mx - radius_m, my + radius_m, zoom);
        let (x, y) = transform.flip_y(x, y, zoom);

        let offset = (cx - x).max(cy - y).max(0);
        let width = u32::try_from(offset * 2).unwrap_or(u32::MAX).max(1);

        Self { x, y, width, zoom }
    }

    /// Tiles covered by the block, including any outside the grid.
    pub fn tile_count(&self) -> u64 {
        u64::from(self.width) * u64::from(self.width)
    }

    /// Tiles in the block that exist at its zoom, column by column.
    pub fn tiles(&self) -> Vec<TileCoord> {
        let limit = i64::try_from(grid_size(self.zoom)).unwrap_or(i64::MAX);
        let in_grid = |v: i64| (0..limit).contains(&v);
        let span = i64::from(self.width);

        let mut tiles = Vec::new();
        for x in (self.x..self.x + span).filter(|&x| in_grid(x)) {
            for y in (self.y..self.y + span).filter(|&y| in_grid(y)) {
                // Range was checked against the grid above.
                if let Ok(tile) = TileCoord::new(x as u32, y as u32, self.zoom) {
                    tiles.push(tile);
                }
            }
        }
        tiles
    }

    pub fn hashes(&self) -> Vec<GeoHash> {
        self.tiles().iter().map(TileCoord::geohash).collect()
    }
}

/// Everything known about one stop's service.
#[derive(Debug, Clone, PartialEq)]
pub struct StopSchedule {
    pub stop_id: FeatureId,
    pub location: LatLng,
    pub agency: Option<String>,
    /// Lines in page order
    pub lines: Vec<BusLine>,
}

/// Orchestrates tile lookups and stop page scraping.
#[derive(Debug, Clone)]
pub struct Proximity<S, T = GlobalMercator> {
    source: S,
    transform: T,
    config: ProximityConfig,
}

impl<S: MetadataSource> Proximity<S> {
    /// Use spherical Mercator tiles.
    pub fn mercator(source: S, config: ProximityConfig) -> Self {
        Self::new(source, GlobalMercator::default(), config)
    }
}

impl<S: MetadataSource, T: CoordinateTransform> Proximity<S, T> {
    pub fn new(source: S, transform: T, config: ProximityConfig) -> Self {
        Self {
            source,
            transform,
            config,
        }
    }

    pub fn config(&self) -> &ProximityConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Tiles to query for a search around a point.
    pub fn tile_block(&self, lat: f64, lng: f64, radius_m: f64, zoom: u8) -> TileBlock {
        TileBlock::around(&self.transform, lat, lng, radius_m, zoom)
    }

    /// Bus stops within `radius_m` of a point.
    ///
    /// An area without landmark data yields an empty map. A response that
    /// cannot be repaired is [`MetadataError::Malformed`].
    pub async fn find_nearby_stops(
        &self,
        lat: f64,
        lng: f64,
        radius_m: f64,
        zoom: u8,
    ) -> Result<BusStops, MetadataError> {
        let block = self.tile_block(lat, lng, radius_m, zoom);
        self.stops_in_block(&block).await
    }

    /// Bus stops on the tiles of `block`.
    ///
    /// Blocks larger than the configured tile limit are refused before any
    /// tile is enumerated.
    pub async fn stops_in_block(&self, block: &TileBlock) -> Result<BusStops, MetadataError> {
        let tiles = block.tile_count();
        if tiles > self.config.max_tiles {
            return Err(MetadataError::BlockTooLarge {
                tiles,
                limit: self.config.max_tiles,
            });
        }

        let hashes = block.hashes();
        if hashes.is_empty() {
            debug!(?block, "tile block lies outside the grid");
            return Ok(BusStops::new());
        }

        let body = self.source.fetch_tiles(block.zoom, &hashes).await?;
        let stops = match decode_tile_metadata(&body)? {
            TileMetadata::NoData => BusStops::new(),
            TileMetadata::Features(features) => {
                extract_bus_stops(&features, self.config.stop_sentinel)
            }
        };

        info!(tiles = hashes.len(), stops = stops.len(), "nearby stop search");
        Ok(stops)
    }

    /// Coordinates, agency and lines of a stop.
    pub async fn stop_schedule(&self, id: &FeatureId) -> Result<StopSchedule, MetadataError> {
        let (detail, page) = tokio::try_join!(
            self.source.fetch_stop_detail(id),
            self.source.fetch_schedule_page(id),
        )?;

        let detail = decode_stop_detail(&detail)?;
        let lines = extract_schedule(&page);
        debug!(%id, lines = lines.len(), "stop schedule");

        Ok(StopSchedule {
            stop_id: id.clone(),
            location: detail.location,
            agency: detail.agency,
            lines,
        })
    }
}
