//! Domain types for bus stop discovery and departure watching.
//!
//! Types here validate at construction where they carry an invariant
//! (tile ranges, hash alphabet), so code receiving them can trust them.

mod geohash;
mod line;
mod stop;

pub use geohash::{GeoHash, InvalidTile, MAX_ZOOM, TileCoord, encode as encode_tile, grid_size};
pub use line::{BusLine, Departure};
pub use stop::{BusStop, BusStops, FeatureId, LatLng};
