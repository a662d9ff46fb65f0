//! Spherical Web Mercator transforms.
//!
//! Converts WGS84 positions to projected meters and on to tile indices.
//! Tiles are first computed in the TMS convention (origin bottom-left) and
//! then flipped to the XYZ convention (origin top-left) used by the tile
//! metadata service.

use std::f64::consts::PI;

/// Equatorial radius of the WGS84 ellipsoid, in meters.
const EARTH_RADIUS: f64 = 6_378_137.0;

/// Half the projected world width, in meters.
const ORIGIN_SHIFT: f64 = PI * EARTH_RADIUS;

/// Coordinate transform between geographic and tile space.
///
/// The proximity search only needs these three operations, so alternative
/// projections (or fixed test fixtures) can stand in for [`GlobalMercator`].
pub trait CoordinateTransform: Send + Sync {
    /// Project latitude/longitude (degrees) to Mercator meters.
    fn lat_lon_to_meters(&self, lat: f64, lng: f64) -> (f64, f64);

    /// Tile (TMS convention) containing the given meters at `zoom`.
    fn meters_to_tile(&self, mx: f64, my: f64, zoom: u8) -> (i64, i64);

    /// Convert between TMS and XYZ tile row conventions.
    fn flip_y(&self, tx: i64, ty: i64, zoom: u8) -> (i64, i64);
}

/// Spherical Mercator with square tiles.
#[derive(Debug, Clone, Copy)]
pub struct GlobalMercator {
    tile_size: u32,
}

impl GlobalMercator {
    pub fn new(tile_size: u32) -> Self {
        Self { tile_size }
    }

    /// Meters per pixel at `zoom`.
    pub fn resolution(&self, zoom: u8) -> f64 {
        let initial = 2.0 * ORIGIN_SHIFT / f64::from(self.tile_size);
        initial / 2.0_f64.powi(i32::from(zoom))
    }
}

impl Default for GlobalMercator {
    fn default() -> Self {
        Self::new(256)
    }
}

impl CoordinateTransform for GlobalMercator {
    fn lat_lon_to_meters(&self, lat: f64, lng: f64) -> (f64, f64) {
        let mx = lng * ORIGIN_SHIFT / 180.0;
        let my = ((90.0 + lat) * PI / 360.0).tan().ln() / (PI / 180.0);
        (mx, my * ORIGIN_SHIFT / 180.0)
    }

    fn meters_to_tile(&self, mx: f64, my: f64, zoom: u8) -> (i64, i64) {
        let res = self.resolution(zoom);
        let px = (mx + ORIGIN_SHIFT) / res;
        let py = (my + ORIGIN_SHIFT) / res;
        let size = f64::from(self.tile_size);
        let tx = (px / size).ceil() as i64 - 1;
        let ty = (py / size).ceil() as i64 - 1;
        (tx, ty)
    }

    fn flip_y(&self, tx: i64, ty: i64, zoom: u8) -> (i64, i64) {
        (tx, (1i64 << zoom) - 1 - ty)
    }
}
