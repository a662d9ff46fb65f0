//! Upstream map metadata: transport and response decoding.
//!
//! Key characteristics of the upstream service:
//! - Tile metadata is pseudo-JSON wrapped in a JSONP callback and needs
//!   grammar repair before it parses (see [`repair`])
//! - An empty area and a broken integration look different: the former
//!   decodes to [`TileMetadata::NoData`], the latter to a [`PayloadError`]
//! - Stop details escape non-ASCII characters as `\xNN`

mod client;
mod detail;
mod error;
mod landmarks;
mod mock;
pub mod repair;
mod source;

pub use client::{MetadataClient, MetadataConfig};
pub use detail::{StopDetail, decode_hex_escapes, decode_stop_detail};
pub use error::MetadataError;
pub use landmarks::{
    BUS_STOP_BOUNDING_BOX, BoundingBox, LandmarkFeature, PayloadError, TileMetadata,
    decode_tile_metadata, extract_bus_stops, strip_envelope,
};
pub use mock::MockMetadataSource;
pub use source::{AnySource, MetadataSource};
