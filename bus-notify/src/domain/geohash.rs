//! Tile addressing with the base-4 "geohash" used by the tile metadata service.
//!
//! Each character of a hash encodes one level of the tile quad-tree. The
//! character's 2-bit value carries one bit of `x` (high bit) and one bit of
//! `y` (low bit), most-significant level first. The four digit values are
//! spelled `t`, `u`, `v`, `w`.
//!
//! This is unrelated to the standard geohash geocoding scheme.

use std::fmt;

/// Characters for the digit values 0, 1, 2 and 3.
const ALPHABET: [u8; 4] = [b't', b'u', b'v', b'w'];

/// Deepest zoom a hash can address with 32-bit tile indices.
pub const MAX_ZOOM: u8 = 32;

/// Error returned when a tile coordinate or hash is invalid.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidTile {
    /// Zoom beyond what 32-bit tile indices can address
    #[error("zoom {0} exceeds maximum of {MAX_ZOOM}")]
    Zoom(u8),

    /// Tile index outside `0..2^zoom`
    #[error("tile ({x}, {y}) is outside the grid at zoom {zoom}")]
    OutOfRange { x: u32, y: u32, zoom: u8 },

    /// Hash contains a character outside the alphabet
    #[error("invalid geohash character {0:?}")]
    Character(char),
}

/// A tile in the quad-tree subdivision of the map.
///
/// Construction checks `0 <= x, y < 2^zoom`, so every `TileCoord` can be
/// encoded without further validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord {
    x: u32,
    y: u32,
    zoom: u8,
}

impl TileCoord {
    /// Create a tile coordinate, rejecting indices outside the zoom's grid.
    pub fn new(x: u32, y: u32, zoom: u8) -> Result<Self, InvalidTile> {
        if zoom > MAX_ZOOM {
            return Err(InvalidTile::Zoom(zoom));
        }
        let limit = grid_size(zoom);
        if u64::from(x) >= limit || u64::from(y) >= limit {
            return Err(InvalidTile::OutOfRange { x, y, zoom });
        }
        Ok(Self { x, y, zoom })
    }

    pub fn x(&self) -> u32 {
        self.x
    }

    pub fn y(&self) -> u32 {
        self.y
    }

    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    /// Encode this tile as a geohash of exactly `zoom` characters.
    pub fn geohash(&self) -> GeoHash {
        encode(self.x, self.y, self.zoom)
    }
}

/// Number of tiles along one axis at `zoom`.
pub fn grid_size(zoom: u8) -> u64 {
    1u64 << zoom.min(MAX_ZOOM)
}

/// A tile address in the service's base-4 alphabet.
///
/// The string length is the zoom level.
///
/// # Examples
///
/// ```
/// use bus_notify::domain::GeoHash;
///
/// let hash = GeoHash::parse("tuvw").unwrap();
/// let tile = hash.decode();
/// assert_eq!((tile.x(), tile.y(), tile.zoom()), (3, 5, 4));
/// assert_eq!(tile.geohash(), hash);
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeoHash(String);

impl GeoHash {
    /// Parse a hash, checking its alphabet and length.
    pub fn parse(s: &str) -> Result<Self, InvalidTile> {
        if s.len() > usize::from(MAX_ZOOM) {
            return Err(InvalidTile::Zoom(s.len().min(u8::MAX as usize) as u8));
        }
        if let Some(c) = s.chars().find(|c| digit_value(*c).is_none()) {
            return Err(InvalidTile::Character(c));
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The zoom level this hash addresses.
    pub fn zoom(&self) -> u8 {
        self.0.len() as u8
    }

    /// Recover the tile coordinate.
    ///
    /// The last character holds bit 0 of each axis, the first holds bit
    /// `zoom - 1`.
    pub fn decode(&self) -> TileCoord {
        let mut x = 0u32;
        let mut y = 0u32;
        for (shift, c) in self.0.chars().rev().enumerate() {
            // Alphabet was checked in `parse`.
            let digit = digit_value(c).unwrap_or(0);
            x |= u32::from((digit >> 1) & 1) << shift;
            y |= u32::from(digit & 1) << shift;
        }
        TileCoord {
            x,
            y,
            zoom: self.zoom(),
        }
    }
}

impl fmt::Debug for GeoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GeoHash({})", self.0)
    }
}

impl fmt::Display for GeoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Encode raw tile indices as a geohash of `zoom` characters.
///
/// `x` and `y` must be below `2^zoom`; higher bits are not represented in
/// the output. Prefer [`TileCoord::geohash`], which enforces this.
pub fn encode(x: u32, y: u32, zoom: u8) -> GeoHash {
    debug_assert!(zoom <= MAX_ZOOM);
    debug_assert!(u64::from(x) < grid_size(zoom) && u64::from(y) < grid_size(zoom));

    let hash = (0..u32::from(zoom))
        .rev()
        .map(|bit| {
            let hi = (x >> bit) & 1;
            let lo = (y >> bit) & 1;
            char::from(ALPHABET[((hi << 1) | lo) as usize])
        })
        .collect();
    GeoHash(hash)
}

fn digit_value(c: char) -> Option<u8> {
    ALPHABET.iter().position(|&a| char::from(a) == c).map(|i| i as u8)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    /// Strategy for a zoom and a tile inside its grid.
    fn tile_in_grid() -> impl Strategy<Value = (u32, u32, u8)> {
        (1u8..=20).prop_flat_map(|zoom| {
            let max = (1u32 << zoom) - 1;
            (0..=max, 0..=max, Just(zoom))
        })
    }

    proptest! {
        /// Decoding an encoded tile yields the same tile
        #[test]
        fn roundtrip((x, y, zoom) in tile_in_grid()) {
            let tile = TileCoord::new(x, y, zoom).unwrap();
            prop_assert_eq!(tile.geohash().decode(), tile);
        }

        /// Hash length always equals zoom
        #[test]
        fn length_is_zoom((x, y, zoom) in tile_in_grid()) {
            prop_assert_eq!(encode(x, y, zoom).as_str().len(), usize::from(zoom));
        }

        /// Any string over the alphabet re-encodes to itself
        #[test]
        fn hash_roundtrip(s in "[tuvw]{1,20}") {
            let hash = GeoHash::parse(&s).unwrap();
            prop_assert_eq!(hash.decode().geohash(), hash);
        }
    }
}
